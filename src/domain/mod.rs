pub mod inspect;
pub mod proxy_config;
