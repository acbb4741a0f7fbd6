pub mod proxy;
pub mod token;

pub use proxy::{Backend, ProxyResponse, ServiceProxy};
pub use token::{Claims, Principal, TokenService};
