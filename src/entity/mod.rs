pub mod audit_logs;
pub mod members;
pub mod orders;
pub mod products;

pub use audit_logs::Entity as AuditLogs;
pub use members::Entity as Members;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
