pub mod item;
pub mod payment_due;
pub mod sale;
pub mod sale_line;
pub mod user;
