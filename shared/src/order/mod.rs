//! Order domain: status pipeline and canonical model

mod model;
mod status;

pub use model::{Order, OrderItem};
pub use status::{OrderStatus, PIPELINE};
