//! End-to-end tests for the `taxonomy!` macro against a runtime registry.

use tag_taxonomy::*;

taxonomy! {
    pub mod tags {
        blockchain {
            db {
                leaf;
                array;
                type {
                    #[is(blockchain.db.leaf)]
                    #[leaf = "boolean"]
                    boolean;
                    #[is(blockchain.db.leaf)]
                    #[leaf = "bigint"]
                    bigint;
                    array {
                        of {
                            #[is(blockchain.db.array, blockchain.db.leaf)]
                            #[leaf = "array.of.tags"]
                            tags;
                        }
                    }
                }
            }
            session {
                configuration {
                    value;
                }
            }
            r#type {
                money;
            }
            app {
                configuration {
                    apple {
                        pay {
                            is {
                                /// Whether Apple Pay is offered at checkout.
                                #[is(blockchain.db.type.boolean, blockchain.session.configuration.value)]
                                #[leaf = "boolean"]
                                enabled;
                            }
                        }
                    }
                }
                deep_link;
            }
            ux {
                KYC;
                payment {
                    method {
                        #[leaf]
                        in;
                        #[deprecated(note = "use blockchain.ux.payment.method.in")]
                        for;
                    }
                }
            }
        }
    }
}

fn registry() -> Registry {
    Registry::from_defs(tags::DEFINITIONS).unwrap()
}

#[test]
fn apple_pay_enabled_is_transitively_a_leaf() {
    let registry = registry();
    let enabled = tags::blockchain::app::configuration::apple::pay::is::enabled::resolve(&registry)
        .unwrap();

    assert!(enabled.is_a("blockchain.db.leaf"));
    assert!(enabled.is_a(tags::blockchain::db::r#type::boolean::ID));
    assert!(enabled.is_a("blockchain.session.configuration.value"));
    assert!(!enabled.is_a("blockchain.type.money"));
    assert_eq!(enabled.leaf_kind(), Some(LeafKind::Boolean));
}

#[test]
fn child_navigation_matches_generated_paths() {
    let registry = registry();
    let config = registry
        .resolve("blockchain.app")
        .unwrap()
        .child("configuration")
        .unwrap();
    assert_eq!(config.path(), "blockchain.app.configuration");
    assert_eq!(config.path(), tags::blockchain::app::configuration::PATH);
}

#[test]
fn constants_describe_each_node() {
    use tags::blockchain::db::r#type::array::of::tags as array_of_tags;

    assert_eq!(array_of_tags::PATH, "blockchain.db.type.array.of.tags");
    assert_eq!(array_of_tags::DEPTH, 5);
    assert_eq!(array_of_tags::ID, fingerprint(array_of_tags::PATH));
    assert_eq!(array_of_tags::SUPERTYPES, ["blockchain.db.array", "blockchain.db.leaf"]);
    assert!(array_of_tags::IS_LEAF);
    assert_eq!(
        array_of_tags::LEAF_KIND,
        Some(LeafKind::ArrayOf(ElementKind::Tag))
    );

    assert!(!tags::blockchain::app::IS_LEAF);
    assert_eq!(tags::blockchain::DEPTH, 0);
}

#[test]
fn keyword_and_uppercase_segments_resolve() {
    let registry = registry();
    let kyc = tags::blockchain::ux::KYC::resolve(&registry).unwrap();
    assert_eq!(kyc.path(), "blockchain.ux.KYC");

    let method_in = tags::blockchain::ux::payment::method::r#in::resolve(&registry).unwrap();
    assert!(method_in.is_leaf());
    assert_eq!(method_in.leaf_kind(), None);

    assert_eq!(tags::blockchain::r#type::money::PATH, "blockchain.type.money");
}

#[test]
#[allow(deprecated)]
fn deprecated_tags_are_still_registered() {
    let registry = registry();
    assert!(registry.contains(tags::blockchain::ux::payment::method::r#for::PATH));
}

#[test]
fn same_name_children_stay_distinct() {
    // `configuration` under app and session, `array` under db and db.type.
    assert_ne!(
        tags::blockchain::app::configuration::ID,
        tags::blockchain::session::configuration::ID
    );
    assert_ne!(
        tags::blockchain::db::array::PATH,
        tags::blockchain::db::r#type::array::PATH
    );

    let registry = registry();
    let db_array = tags::blockchain::db::array::resolve(&registry).unwrap();
    let type_array = tags::blockchain::db::r#type::array::resolve(&registry).unwrap();
    assert_ne!(db_array, type_array);
    assert_eq!(db_array.name(), type_array.name());
}

#[test]
fn definitions_cover_every_node() {
    assert_eq!(tags::DEFINITIONS.len(), tags::NODE_COUNT);
    assert_eq!(registry().len(), tags::NODE_COUNT);
    assert_eq!(tags::DEFINITIONS[0].path, "blockchain");
}

#[test]
fn implementors_find_every_leaf() {
    let registry = registry();
    let mut leaves: Vec<&str> = registry
        .implementors("blockchain.db.leaf")
        .into_iter()
        .map(|tag| tag.path())
        .collect();
    leaves.sort_unstable();
    assert_eq!(
        leaves,
        [
            "blockchain.app.configuration.apple.pay.is.enabled",
            "blockchain.db.leaf",
            "blockchain.db.type.array.of.tags",
            "blockchain.db.type.bigint",
            "blockchain.db.type.boolean",
        ]
    );
}

#[test]
fn extractors_apply_to_generated_tags() {
    let registry = registry();
    let labels = Extractors::standard(|path: &str| match path {
        "blockchain.ux.KYC" => "Identity verification".to_owned(),
        other => other.to_owned(),
    });
    let kyc = tags::blockchain::ux::KYC::resolve(&registry).unwrap();
    assert_eq!(kyc.extract(&labels, "id").unwrap(), "blockchain.ux.KYC");
    assert_eq!(
        kyc.extract(&labels, "localizedType").unwrap(),
        "Identity verification"
    );
}
