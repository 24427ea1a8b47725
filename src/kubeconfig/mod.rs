//! A minimal implementation of the Kubernetes kubeconfig file format.
//!
//! Field names match the upstream `clientcmd/api/v1` types. Scalars are
//! optional so that unset and empty values stay distinct, and unknown fields
//! are kept so a file can be rewritten without losing anything.
mod find;
mod marshal;
mod merge;
mod types;

pub use find::{
    decode_extension, encode_extension, find_auth_info, find_cluster, find_context, find_extension,
    find_extension_from,
};
pub use merge::{merge_all, merge_config};
pub use types::{
    AuthInfo, AuthProviderConfig, Cluster, Config, Context, ExecConfig, ExecEnvVar, Extension,
    HasExtensions, Named, NamedAuthInfo, NamedCluster, NamedContext, NamedExtension, Preferences,
    Remaining,
};
