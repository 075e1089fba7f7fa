use async_trait::async_trait;
use prismic_nodes::core::type_paths::TypePathStore;
use prismic_nodes::domain::model::{
    Document, FieldType, LinkField, NodeId, NormalizedImageField, NormalizedLinkField,
    NormalizedStructuredTextField, StructuredTextBlock,
};
use prismic_nodes::domain::ports::{FieldNormalizers, NodeEnvironment};
use prismic_nodes::domain::schema::Schemas;
use prismic_nodes::{
    documents_to_nodes, DefaultNormalizers, DocumentsToNodesEnvironment, ImagePolicy,
    MemoryEnvironment, PluginOptions, PrismicError,
};
use serde_json::{json, Value};

fn schemas() -> Schemas {
    serde_json::from_value(json!({
        "page": {
            "Main": {
                "uid": {"type": "UID", "config": {}},
                "title": {"type": "StructuredText", "config": {}},
                "count": {"type": "Number", "config": {}},
                "related": {"type": "Link", "config": {}},
                "gallery": {
                    "type": "Group",
                    "config": {"fields": {
                        "caption": {"type": "Text", "config": {}},
                        "photo": {"type": "Image", "config": {}}
                    }}
                }
            },
            "Body": {
                "body": {
                    "type": "Slices",
                    "config": {"choices": {
                        "quote": {
                            "type": "Slice",
                            "non-repeat": {"quote": {"type": "StructuredText", "config": {}}},
                            "repeat": {"author": {"type": "Text", "config": {}}}
                        }
                    }}
                }
            }
        }
    }))
    .unwrap()
}

fn page(id: &str, lang: &str, data: Value) -> Value {
    json!({
        "id": id,
        "uid": format!("{}-uid", id.to_lowercase()),
        "type": "page",
        "lang": lang,
        "tags": ["news"],
        "first_publication_date": "2020-05-01T10:00:00+0000",
        "last_publication_date": "2020-05-02T10:00:00+0000",
        "alternate_languages": [],
        "data": data
    })
}

struct Sourced {
    nodes: MemoryEnvironment,
    type_paths: TypePathStore,
    ids: Vec<NodeId>,
}

impl Sourced {
    fn node(&self, id: &str) -> Value {
        serde_json::to_value(self.nodes.get(id).expect("node exists")).unwrap()
    }
}

async fn source_with(
    options: &PluginOptions,
    normalizers: &dyn FieldNormalizers,
    documents: Value,
) -> prismic_nodes::Result<Sourced> {
    let documents: Vec<Document> = serde_json::from_value(documents)?;
    let nodes = MemoryEnvironment::new("test-repo");
    let type_paths = TypePathStore::new();

    let ids = {
        let env = DocumentsToNodesEnvironment::new(&nodes, normalizers, &type_paths, options);
        documents_to_nodes(documents, &env).await?
    };

    Ok(Sourced {
        nodes,
        type_paths,
        ids,
    })
}

async fn source(options: &PluginOptions, documents: Value) -> prismic_nodes::Result<Sourced> {
    source_with(options, &DefaultNormalizers, documents).await
}

fn options() -> PluginOptions {
    PluginOptions::new("test-repo", "token")
        .with_schemas(schemas())
        .with_path_links("/", false)
}

#[tokio::test]
async fn test_document_fields_are_normalized() -> anyhow::Result<()> {
    let data = json!({
        "uid": "home",
        "title": [{"type": "heading1", "text": "Welcome", "spans": []}],
        "count": 3,
        "related": {
            "link_type": "Document",
            "id": "B",
            "type": "page",
            "uid": "about",
            "lang": "en-us",
            "isBroken": false
        },
        "gone": {"link_type": "Document", "id": "C", "type": "page", "isBroken": true},
        "site": {"link_type": "Web", "url": "https://prismic.io", "target": "_blank"},
        "gallery": [{
            "caption": "One",
            "photo": {
                "url": "https://images.prismic.io/r/1.png",
                "alt": null,
                "copyright": null,
                "dimensions": {"width": 10, "height": 10}
            }
        }]
    });
    let sourced = source(&options(), json!([page("A", "en-us", data.clone())])).await?;

    assert_eq!(sourced.ids.len(), 1);
    let id = &sourced.ids[0];
    assert_eq!(id, &sourced.nodes.create_node_id("A"));

    let node = sourced.node(id);
    assert_eq!(node["prismicId"], "A");
    assert_eq!(node["type"], "page");
    assert_eq!(node["url"], "/page/a-uid");
    assert_eq!(node["internal"]["type"], "PrismicPage");
    assert_eq!(node["dataRaw"], data);
    assert_eq!(serde_json::from_str::<Value>(node["dataString"].as_str().unwrap())?, data);

    assert_eq!(node["data"]["uid"], "home");
    assert_eq!(node["data"]["count"], 3.0);
    assert_eq!(node["data"]["title"]["html"], "<h1>Welcome</h1>");
    assert_eq!(node["data"]["title"]["text"], "Welcome");

    let related = &node["data"]["related"];
    assert_eq!(related["url"], "/page/about");
    assert_eq!(related["document"], sourced.nodes.create_node_id("B"));
    assert_eq!(related["raw"]["uid"], "about");

    let gone = &node["data"]["gone"];
    assert_eq!(gone["url"], "");
    assert_eq!(gone["document"], Value::Null);
    assert_eq!(gone["raw"]["isBroken"], true);

    assert_eq!(node["data"]["site"]["url"], "https://prismic.io");
    assert_eq!(node["data"]["site"]["target"], "_blank");

    let photo = &node["data"]["gallery"][0]["photo"];
    assert_eq!(photo["url"], "https://images.prismic.io/r/1.png");
    assert_eq!(photo["localFile"], Value::Null);
    assert_eq!(node["data"]["gallery"][0]["caption"], "One");

    Ok(())
}

#[tokio::test]
async fn test_slices_become_nodes_restricted_to_schema() -> anyhow::Result<()> {
    let data = json!({
        "body": [
            {
                "slice_type": "quote",
                "slice_label": null,
                "primary": {
                    "quote": [{"type": "paragraph", "text": "Hi", "spans": []}],
                    "stray": "not in the schema"
                },
                "items": [{"author": "Ann"}, {"author": "Bo", "extra": 1}]
            },
            {
                "slice_type": "quote",
                "slice_label": "wide",
                "primary": {"quote": []},
                "items": []
            }
        ]
    });
    let sourced = source(&options(), json!([page("A", "en-us", data)])).await?;
    let node = sourced.node(&sourced.ids[0]);

    let body = node["data"]["body"].as_array().unwrap();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0], sourced.nodes.create_node_id("A page_data_body 0"));
    assert_eq!(body[1], sourced.nodes.create_node_id("A page_data_body 1"));

    let first = sourced.node(body[0].as_str().unwrap());
    assert_eq!(first["slice_type"], "quote");
    assert_eq!(first["internal"]["type"], "PrismicPageBodyQuote");
    assert_eq!(first["primary"]["quote"]["html"], "<p>Hi</p>");
    assert!(first["primary"].get("stray").is_none());
    assert_eq!(first["items"][0]["author"], "Ann");
    assert_eq!(first["items"][1]["author"], "Bo");
    assert!(first["items"][1].get("extra").is_none());

    let second = sourced.node(body[1].as_str().unwrap());
    assert_eq!(second["slice_label"], "wide");
    assert_eq!(second["primary"]["quote"]["html"], "");

    // document plus two slices
    assert_eq!(sourced.nodes.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_slices_without_schema_keep_every_field() -> anyhow::Result<()> {
    let options = PluginOptions::new("test-repo", "token");
    let data = json!({
        "body": [{
            "slice_type": "banner",
            "primary": {"headline": "Big", "stray": true},
            "items": []
        }]
    });
    let sourced = source(&options, json!([page("A", "en-us", data)])).await?;
    let node = sourced.node(&sourced.ids[0]);

    let slice = sourced.node(node["data"]["body"][0].as_str().unwrap());
    assert_eq!(slice["primary"]["headline"], "Big");
    assert_eq!(slice["primary"]["stray"], true);
    assert_eq!(node["url"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_documents_outside_lang_are_skipped() -> anyhow::Result<()> {
    let options = options().with_lang("en-us");
    let sourced = source(
        &options,
        json!([
            page("A", "en-us", json!({})),
            page("B", "fr-fr", json!({})),
            page("C", "en-us", json!({}))
        ]),
    )
    .await?;

    assert_eq!(sourced.ids.len(), 2);
    assert_eq!(sourced.nodes.len(), 2);
    assert!(sourced.nodes.get(&sourced.nodes.create_node_id("B")).is_none());
    Ok(())
}

#[tokio::test]
async fn test_type_paths_are_recorded_once() -> anyhow::Result<()> {
    let data = json!({
        "title": [{"type": "paragraph", "text": "x", "spans": []}],
        "related": {"link_type": "Web", "url": "https://a.io"},
        "gallery": [{"caption": "c", "photo": {"url": "https://i/1.png", "dimensions": {"width": 1, "height": 1}}}],
        "body": [{"slice_type": "quote", "primary": {"quote": []}, "items": [{"author": "a"}]}],
        "color": "#fff"
    });
    let sourced = source(
        &options(),
        json!([page("A", "en-us", data.clone()), page("B", "en-us", data)]),
    )
    .await?;

    let entries = sourced.type_paths.entries();
    let unique: std::collections::HashSet<_> = entries.iter().map(|e| e.path.clone()).collect();
    assert_eq!(unique.len(), entries.len());

    let type_of = |segments: &[&str]| {
        let path: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        sourced.type_paths.get(&path).map(|entry| entry.type_name)
    };

    assert_eq!(type_of(&["page"]).as_deref(), Some("PrismicPage"));
    assert_eq!(
        type_of(&["page", "data", "title"]),
        Some(FieldType::StructuredText.graphql_type().to_string())
    );
    assert_eq!(
        type_of(&["page", "data", "related"]),
        Some(FieldType::Link.graphql_type().to_string())
    );
    assert_eq!(
        type_of(&["page", "data", "gallery"]).as_deref(),
        Some("PrismicPageGalleryGroupType")
    );
    assert_eq!(
        type_of(&["page", "data", "gallery", "photo"]),
        Some(FieldType::Image.graphql_type().to_string())
    );
    assert_eq!(
        type_of(&["page", "data", "body"]).as_deref(),
        Some("PrismicPageBodySlicesType")
    );
    assert_eq!(
        type_of(&["page", "data", "body", "quote", "items"]).as_deref(),
        Some("PrismicPageBodyQuoteItemType")
    );
    assert_eq!(
        type_of(&["page", "data", "body", "quote", "items", "author"]).as_deref(),
        Some("String")
    );
    // no schema entry: inferred from the value
    assert_eq!(type_of(&["page", "data", "color"]).as_deref(), Some("String"));
    assert_eq!(
        type_of(&["page", "alternate_languages"]).as_deref(),
        Some("AlternateLanguages")
    );
    Ok(())
}

#[tokio::test]
async fn test_schema_mismatch_reports_field_path() {
    let result = source(&options(), json!([page("A", "en-us", json!({"count": "many"}))])).await;

    match result {
        Err(PrismicError::NormalizationError { path, .. }) => {
            assert_eq!(path, "page.data.count");
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected a normalization error"),
    }
}

#[tokio::test]
async fn test_alternate_languages_are_resolved() -> anyhow::Result<()> {
    let options = options().with_path_links("/", true);
    let mut doc = page("A", "en-us", json!({}));
    doc["alternate_languages"] = json!([{"id": "F", "uid": "accueil", "type": "page", "lang": "fr-fr"}]);

    let sourced = source(&options, json!([doc])).await?;
    let node = sourced.node(&sourced.ids[0]);

    let alternate = &node["alternate_languages"][0];
    assert_eq!(alternate["link_type"], "Document");
    assert_eq!(alternate["url"], "/fr-fr/page/accueil");
    assert_eq!(alternate["document"], sourced.nodes.create_node_id("F"));
    assert_eq!(alternate["raw"]["link_type"], "Any");
    assert_eq!(alternate["raw"]["uid"], "accueil");
    assert_eq!(node["url"], "/en-us/page/a-uid");
    Ok(())
}

#[tokio::test]
async fn test_unfilled_fields_normalize_cleanly() -> anyhow::Result<()> {
    let schemas: Schemas = serde_json::from_value(json!({
        "blank": {
            "Main": {
                "where": {"type": "GeoPoint", "config": {}},
                "video": {"type": "Embed", "config": {}},
                "photo": {"type": "Image", "config": {}},
                "related": {"type": "Link", "config": {}},
                "title": {"type": "StructuredText", "config": {}},
                "flag": {"type": "Boolean", "config": {}},
                "count": {"type": "Number", "config": {}},
                "color": {"type": "Color", "config": {}},
                "published": {"type": "Date", "config": {}},
                "stamp": {"type": "Timestamp", "config": {}},
                "choice": {"type": "Select", "config": {}},
                "label": {"type": "Text", "config": {}},
                "links": {
                    "type": "Group",
                    "config": {"fields": {"caption": {"type": "Text", "config": {}}}}
                },
                "body": {"type": "Slices", "config": {"choices": {}}}
            }
        }
    }))?;
    let options = PluginOptions::new("test-repo", "token").with_schemas(schemas);

    let data = json!({
        "where": {},
        "video": {},
        "photo": {},
        "related": {"link_type": "Any"},
        "title": [],
        "flag": false,
        "count": null,
        "color": null,
        "published": null,
        "stamp": null,
        "choice": null,
        "label": null,
        "links": [{}],
        "body": []
    });
    let sourced = source(
        &options,
        json!([{"id": "E", "type": "blank", "lang": "en-us", "data": data}]),
    )
    .await?;
    let node = sourced.node(&sourced.ids[0]);
    let fields = &node["data"];

    assert_eq!(fields["where"], Value::Null);
    assert_eq!(fields["video"], json!({}));
    assert_eq!(fields["photo"]["url"], Value::Null);
    assert_eq!(fields["photo"]["localFile"], Value::Null);
    assert_eq!(fields["related"]["url"], "");
    assert_eq!(fields["related"]["document"], Value::Null);
    assert_eq!(fields["title"]["html"], "");
    assert_eq!(fields["flag"], false);
    assert_eq!(fields["count"], Value::Null);
    assert_eq!(fields["links"], json!([{}]));
    assert_eq!(fields["body"], json!([]));

    let where_path: Vec<String> = ["blank", "data", "where"].iter().map(|s| s.to_string()).collect();
    assert_eq!(
        sourced.type_paths.get(&where_path).map(|entry| entry.type_name),
        Some(FieldType::GeoPoint.graphql_type().to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_link_raw_is_a_copy_of_the_source() -> anyhow::Result<()> {
    let cover = json!({
        "link_type": "Media",
        "name": "cover.png",
        "kind": "image",
        "url": "https://images.prismic.io/r/cover.png",
        "size": "2048",
        "height": "400",
        "width": "600"
    });
    let sourced = source(&options(), json!([page("A", "en-us", json!({"cover": cover.clone()}))])).await?;
    let node = sourced.node(&sourced.ids[0]);

    let link = &node["data"]["cover"];
    assert_eq!(link["raw"], cover);
    assert_eq!(link["url"], "https://images.prismic.io/r/cover.png");
    assert_eq!(link["height"], "400");
    assert_eq!(link["width"], "600");
    Ok(())
}

#[tokio::test]
async fn test_image_thumbnails_and_normalization_policy() -> anyhow::Result<()> {
    let image = json!({
        "url": "https://images.prismic.io/r/main.png",
        "alt": "Main",
        "copyright": null,
        "dimensions": {"width": 800, "height": 600},
        "edit": {"x": 0, "y": 0, "zoom": 1},
        "mobile": {
            "url": "https://images.prismic.io/r/mobile.png",
            "alt": "Main",
            "copyright": null,
            "dimensions": {"width": 400, "height": 300}
        }
    });
    let options = options().with_image_normalization(ImagePolicy::predicate(|ctx| ctx.key != "untouched"));
    let sourced = source(
        &options,
        json!([page("A", "en-us", json!({"hero": image.clone(), "untouched": image}))]),
    )
    .await?;
    let node = sourced.node(&sourced.ids[0]);

    let hero = &node["data"]["hero"];
    assert_eq!(hero["thumbnails"]["mobile"]["url"], "https://images.prismic.io/r/mobile.png");
    assert_eq!(hero["thumbnails"]["mobile"]["dimensions"]["width"], 400);
    assert!(hero.get("mobile").is_none());
    assert_eq!(hero["edit"]["zoom"], 1);

    let untouched = &node["data"]["untouched"];
    assert!(untouched.get("thumbnails").is_none());
    assert_eq!(untouched["mobile"]["url"], "https://images.prismic.io/r/mobile.png");
    Ok(())
}

struct UppercaseLinks;

#[async_trait]
impl FieldNormalizers for UppercaseLinks {
    async fn normalize_image(
        &self,
        api_id: &str,
        field: prismic_nodes::domain::model::ImageField,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> prismic_nodes::Result<NormalizedImageField> {
        DefaultNormalizers.normalize_image(api_id, field, path, doc, env).await
    }

    async fn normalize_link(
        &self,
        api_id: &str,
        field: LinkField,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> prismic_nodes::Result<NormalizedLinkField> {
        let mut link = DefaultNormalizers.normalize_link(api_id, field, path, doc, env).await?;
        link.url = link.url.to_uppercase();
        Ok(link)
    }

    async fn normalize_slices(
        &self,
        _api_id: &str,
        field: Vec<NodeId>,
        _path: &[String],
        _doc: &Document,
        _env: &DocumentsToNodesEnvironment<'_>,
    ) -> prismic_nodes::Result<Vec<NodeId>> {
        Ok(field.into_iter().rev().collect())
    }

    async fn normalize_structured_text(
        &self,
        api_id: &str,
        field: Vec<StructuredTextBlock>,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> prismic_nodes::Result<NormalizedStructuredTextField> {
        DefaultNormalizers
            .normalize_structured_text(api_id, field, path, doc, env)
            .await
    }
}

#[tokio::test]
async fn test_custom_normalizers_are_used() -> anyhow::Result<()> {
    let data = json!({
        "related": {"link_type": "Web", "url": "https://prismic.io"},
        "body": [
            {"slice_type": "quote", "primary": {}, "items": []},
            {"slice_type": "quote", "primary": {}, "items": []}
        ]
    });
    let sourced = source_with(&options(), &UppercaseLinks, json!([page("A", "en-us", data)])).await?;
    let node = sourced.node(&sourced.ids[0]);

    assert_eq!(node["data"]["related"]["url"], "HTTPS://PRISMIC.IO");
    assert_eq!(node["data"]["body"][0], sourced.nodes.create_node_id("A page_data_body 1"));
    Ok(())
}
