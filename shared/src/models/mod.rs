//! Domain models and validated input schemas

mod chat;
mod company;
mod customer;
mod finance;
mod machine;
mod manual_job;
mod order;
mod product;
mod production;
mod raw_material;
mod supplier;

pub use chat::*;
pub use company::*;
pub use customer::*;
pub use finance::*;
pub use machine::*;
pub use manual_job::*;
pub use order::*;
pub use product::*;
pub use production::*;
pub use raw_material::*;
pub use supplier::*;
