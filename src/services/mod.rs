pub mod items;
pub mod payments;
pub mod sales;
pub mod stock;
pub mod users;

pub use items::ItemService;
pub use payments::PaymentDueService;
pub use sales::SaleService;
pub use users::UserService;
