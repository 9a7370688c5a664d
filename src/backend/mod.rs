pub mod numeric;
pub mod tensor;


pub use numeric::{GraphFloat, scalar_from_f64, scalar_from_usize};
pub use tensor::{Tensor, broadcast_shapes};
