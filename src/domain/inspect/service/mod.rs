pub mod inspect_service;
