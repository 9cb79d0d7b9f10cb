//! ClusterMaid custom resource and how a reconciliation pass reads it

pub mod cluster_maid;
pub mod controlling_resource;
