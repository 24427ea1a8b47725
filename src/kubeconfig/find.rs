// kubeconfig/find.rs
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{AuthInfo, Cluster, Config, Context, Extension, HasExtensions, NamedExtension, Remaining};

pub fn find_context<'a>(name: &str, config: &'a Config) -> Option<&'a Context> {
    config
        .contexts
        .iter()
        .find(|named| named.name.as_deref() == Some(name))
        .and_then(|named| named.context.as_ref())
}

pub fn find_cluster<'a>(name: &str, config: &'a Config) -> Option<&'a Cluster> {
    config
        .clusters
        .iter()
        .find(|named| named.name.as_deref() == Some(name))
        .and_then(|named| named.cluster.as_ref())
}

pub fn find_auth_info<'a>(name: &str, config: &'a Config) -> Option<&'a AuthInfo> {
    config
        .auth_infos
        .iter()
        .find(|named| named.name.as_deref() == Some(name))
        .and_then(|named| named.user.as_ref())
}

/// Returns the first extension with the given name.
pub fn find_extension<'a>(name: &str, extensions: &'a [NamedExtension]) -> Option<&'a Extension> {
    extensions
        .iter()
        .find(|named| named.name.as_deref() == Some(name))
        .and_then(|named| named.extension.as_ref())
}

/// Returns the named extension attached to any struct that carries extensions.
pub fn find_extension_from<'a, T: HasExtensions>(name: &str, extensible: &'a T) -> Option<&'a Extension> {
    find_extension(name, extensible.extensions())
}

/// Decodes the free-form fields of an extension, ignoring `apiVersion`/`kind`.
pub fn decode_extension<T: DeserializeOwned>(extension: &Extension) -> Result<T, serde_yaml::Error> {
    let mapping: serde_yaml::Mapping = extension
        .remaining
        .iter()
        .map(|(key, value)| (serde_yaml::Value::String(key.clone()), value.clone()))
        .collect();

    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
}

/// Replaces the free-form fields of an extension with a serialized payload.
/// The payload must serialize to a mapping with string keys.
pub fn encode_extension<T: Serialize>(payload: &T, target: &mut Extension) -> Result<(), serde_yaml::Error> {
    let serde_yaml::Value::Mapping(mapping) = serde_yaml::to_value(payload)? else {
        return Err(<serde_yaml::Error as serde::ser::Error>::custom(
            "extension payload must be a mapping",
        ));
    };

    let mut remaining = Remaining::new();
    for (key, value) in mapping {
        let serde_yaml::Value::String(key) = key else {
            return Err(<serde_yaml::Error as serde::ser::Error>::custom(
                "extension payload keys must be strings",
            ));
        };
        remaining.insert(key, value);
    }

    target.remaining = remaining;
    Ok(())
}
