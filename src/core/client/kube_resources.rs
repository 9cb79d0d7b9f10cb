/// Kubernetes resource types used by the controller.

pub use k8s_openapi::api::core::v1::Pod;
