// Kube-rs based Kubernetes client
pub mod kube_client;
pub mod kube_resources;
pub mod pods;

// Sidecar admin interface
pub mod proxy_admin_client;
