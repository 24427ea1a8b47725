use std::collections::{BTreeMap, HashSet};

use kubesel::kubeconfig::{
    merge_all, merge_config, AuthInfo, Cluster, Config, Context, Named, NamedAuthInfo,
    NamedCluster, NamedContext, Remaining,
};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "s-[a-z0-9]{0,6}".prop_map(Some),
    ]
}

fn name() -> impl Strategy<Value = Option<String>> {
    "[a-d]{1,2}".prop_map(Some)
}

fn remaining() -> impl Strategy<Value = Remaining> {
    prop::collection::btree_map(
        "x-[a-z]{1,4}",
        "s-[a-z]{0,4}".prop_map(serde_yaml::Value::String),
        0..3,
    )
}

fn cluster() -> impl Strategy<Value = Cluster> {
    (scalar(), scalar(), prop::option::of(any::<bool>()), remaining()).prop_map(
        |(server, proxy_url, insecure_skip_tls_verify, remaining)| Cluster {
            server,
            proxy_url,
            insecure_skip_tls_verify,
            remaining,
            ..Default::default()
        },
    )
}

fn context() -> impl Strategy<Value = Context> {
    (scalar(), scalar(), scalar(), remaining()).prop_map(|(cluster, user, namespace, remaining)| Context {
        cluster,
        user,
        namespace,
        remaining,
        ..Default::default()
    })
}

fn auth_info() -> impl Strategy<Value = AuthInfo> {
    (scalar(), scalar(), remaining()).prop_map(|(token, username, remaining)| AuthInfo {
        token,
        username,
        remaining,
        ..Default::default()
    })
}

fn config() -> impl Strategy<Value = Config> {
    let clusters = prop::collection::vec(
        (name(), prop::option::of(cluster())).prop_map(|(name, cluster)| NamedCluster {
            name,
            cluster,
            ..Default::default()
        }),
        0..4,
    );
    let contexts = prop::collection::vec(
        (name(), prop::option::of(context())).prop_map(|(name, context)| NamedContext {
            name,
            context,
            ..Default::default()
        }),
        0..4,
    );
    let auth_infos = prop::collection::vec(
        (name(), prop::option::of(auth_info())).prop_map(|(name, user)| NamedAuthInfo {
            name,
            user,
            ..Default::default()
        }),
        0..3,
    );

    (scalar(), clusters, contexts, auth_infos, remaining()).prop_map(
        |(current_context, clusters, contexts, auth_infos, remaining)| Config {
            current_context,
            clusters,
            contexts,
            auth_infos,
            remaining,
            ..Default::default()
        },
    )
}

/// Every named entry of `first`, then the entries of `other` whose name has
/// not been seen yet.
fn first_wins<T: Named + Clone>(first: &[T], other: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut expected = Vec::new();
    for entry in first {
        if let Some(key) = entry.key() {
            seen.insert(key.to_string());
            expected.push(entry.clone());
        }
    }
    for entry in other {
        if let Some(key) = entry.key() {
            if seen.insert(key.to_string()) {
                expected.push(entry.clone());
            }
        }
    }
    expected
}

proptest! {
    #[test]
    fn merge_keeps_the_first_entry_verbatim(a in config(), b in config()) {
        let merged = merge_config(&a, &b);

        prop_assert_eq!(&merged.clusters, &first_wins(&a.clusters, &b.clusters));
        prop_assert_eq!(&merged.contexts, &first_wins(&a.contexts, &b.contexts));
        prop_assert_eq!(&merged.auth_infos, &first_wins(&a.auth_infos, &b.auth_infos));
        prop_assert_eq!(
            merged.current_context.as_ref(),
            a.current_context.as_ref().or(b.current_context.as_ref())
        );
    }

    #[test]
    fn merge_all_folds_left_to_right(a in config(), b in config(), c in config()) {
        let folded = merge_all([&a, &b, &c]);
        prop_assert_eq!(folded, merge_config(&merge_config(&a, &b), &c));
    }

    #[test]
    fn clones_do_not_alias(original in config()) {
        let before = original.to_yaml_string().unwrap();
        let mut copy = original.clone();
        prop_assert_eq!(&copy, &original);

        copy.current_context = Some("mutated".into());
        copy.remaining.insert("x-mutated".into(), serde_yaml::Value::Bool(true));
        if let Some(first) = copy.clusters.first_mut() {
            first.name = Some("mutated".into());
            first.cluster.get_or_insert_with(Cluster::default).server = Some("mutated".into());
        }
        if let Some(context) = copy.contexts.iter_mut().find_map(|named| named.context.as_mut()) {
            context.namespace = Some("mutated".into());
        }

        prop_assert_eq!(original.to_yaml_string().unwrap(), before);
    }

    #[test]
    fn yaml_round_trip(original in config()) {
        let yaml = original.to_yaml_string().unwrap();
        prop_assert_eq!(Config::from_yaml_str(&yaml).unwrap(), original);
    }

    #[test]
    fn json_round_trip(original in config()) {
        let json = original.to_json_string().unwrap();
        prop_assert_eq!(Config::from_yaml_str(&json).unwrap(), original);
    }
}

#[test]
fn unknown_only_documents_round_trip() {
    let mut remaining = BTreeMap::new();
    remaining.insert("x-custom".to_string(), serde_yaml::Value::String(String::new()));
    let original = Config {
        remaining,
        ..Default::default()
    };

    let yaml = original.to_yaml_string().unwrap();
    assert_eq!(Config::from_yaml_str(&yaml).unwrap(), original);
}
