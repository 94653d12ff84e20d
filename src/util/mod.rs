pub mod case;
pub mod http;
