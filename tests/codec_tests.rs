//! Codec facade tests: decoding, encoding and streaming through ODataCodec

use std::cell::Cell;
use std::io::Read;
use std::rc::Rc;
use std::sync::Arc;

use odata_codec_sdk::edm::EdmDecimal;
use odata_codec_sdk::{
    CodecConfig, CodecError, EdmMetadata, IteratorState, ODataCodec, ODataEntity, ODataProperty,
    ODataVersion, PrimitiveValue, PropertyValue, PubFormat,
};

fn codec() -> ODataCodec {
    ODataCodec::new(CodecConfig::default())
}

fn string_value(entity: &ODataEntity, name: &str) -> String {
    match &entity.property(name).unwrap().value {
        PropertyValue::Primitive(PrimitiveValue::String(s)) => s.clone(),
        other => panic!("expected a string for {name}, got {other:?}"),
    }
}

const ATOM_NS: &str = r#"xmlns="http://www.w3.org/2005/Atom" xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata""#;

mod streaming_tests {
    use super::*;

    #[test]
    fn test_two_entity_json_feed() {
        let feed = br#"{"value":[{"Id":"1","Name":"A"},{"Id":"2","Name":"B"}]}"#;
        let mut entities = codec().stream_entities(&feed[..], PubFormat::Json);

        assert!(entities.has_next().unwrap());
        let first = entities.next_entity().unwrap();
        assert_eq!(string_value(&first, "Id"), "1");
        assert_eq!(string_value(&first, "Name"), "A");

        assert!(entities.has_next().unwrap());
        let second = entities.next_entity().unwrap();
        assert_eq!(string_value(&second, "Id"), "2");
        assert_eq!(string_value(&second, "Name"), "B");

        assert!(!entities.has_next().unwrap());
        assert_eq!(entities.state(), IteratorState::Exhausted);
    }

    #[test]
    fn test_empty_json_feed() {
        let mut entities = codec().stream_entities(&br#"{"value":[]}"#[..], PubFormat::Json);
        assert!(!entities.has_next().unwrap());
        assert!(matches!(entities.next_entity(), Err(CodecError::NoSuchElement)));
        assert_eq!(entities.next_link().unwrap(), None);
    }

    #[test]
    fn test_empty_atom_feed() {
        let mut entities = codec().stream_entities(&b"<feed></feed>"[..], PubFormat::Atom);
        assert!(!entities.has_next().unwrap());
        assert_eq!(entities.yielded(), 0);
    }

    #[test]
    fn test_truncated_json_feed() {
        let feed = br#"{"value":[{"Id":"1","Name":"A"},{"Id":"2","Na"#;
        let mut entities = codec().stream_entities(&feed[..], PubFormat::Json);
        assert!(entities.has_next().unwrap());
        entities.next_entity().unwrap();
        assert!(matches!(entities.has_next(), Err(CodecError::MalformedPayload(_))));
    }

    #[test]
    fn test_truncated_atom_feed() {
        let feed = format!(r#"<feed {ATOM_NS}><entry><id>Orders(1)</id><category term="NS.Order""#);
        let mut entities = codec().stream_entities(feed.as_bytes(), PubFormat::Atom);
        assert!(matches!(entities.has_next(), Err(CodecError::MalformedPayload(_))));
        assert_eq!(entities.state(), IteratorState::Closed);
    }

    #[test]
    fn test_next_link_after_exhaustion() {
        let feed = br#"{"odata.metadata":"http://host/svc/$metadata#Orders","value":[{"Id":"1"},{"Id":"2"}],"odata.nextLink":"Orders?$skiptoken=2"}"#;
        let mut entities = codec().stream_entities(&feed[..], PubFormat::Json);

        let mut ids = Vec::new();
        while entities.has_next().unwrap() {
            assert!(matches!(entities.next_link(), Err(CodecError::IterationNotComplete)));
            ids.push(string_value(&entities.next_entity().unwrap(), "Id"));
        }
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(entities.next_link().unwrap().as_deref(), Some("Orders?$skiptoken=2"));
    }

    #[test]
    fn test_large_feed_keeps_order() {
        let items: Vec<String> = (0..500)
            .map(|i| format!(r#"{{"Id":"{i}","Note":"brace {{ and }} in text"}}"#))
            .collect();
        let feed = format!(r#"{{"value":[{}]}}"#, items.join(","));
        let config = CodecConfig::builder().read_buffer_size(64).build();
        let codec = ODataCodec::new(config);

        let ids: Vec<String> = codec
            .stream_entities(feed.as_bytes(), PubFormat::Json)
            .map(|entity| string_value(&entity.unwrap(), "Id"))
            .collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(ids[0], "0");
        assert_eq!(ids[499], "499");
    }

    /// Reader that records when it is dropped
    struct DropFlagReader {
        inner: &'static [u8],
        dropped: Rc<Cell<bool>>,
    }

    impl Read for DropFlagReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for DropFlagReader {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    #[test]
    fn test_input_released_on_exhaustion() {
        let dropped = Rc::new(Cell::new(false));
        let reader = DropFlagReader {
            inner: br#"{"value":[{"Id":"1"},{"Id":"2"}],"odata.nextLink":"Orders?$skip=2"}"#,
            dropped: Rc::clone(&dropped),
        };
        let mut entities = codec().stream_entities(reader, PubFormat::Json);

        let mut read = 0;
        while entities.has_next().unwrap() {
            assert!(!dropped.get());
            entities.next_entity().unwrap();
            read += 1;
        }
        assert_eq!(read, 2);
        assert_eq!(entities.state(), IteratorState::Exhausted);
        assert!(dropped.get());
        // The envelope stays readable after the input is gone
        assert_eq!(entities.next_link().unwrap().as_deref(), Some("Orders?$skip=2"));
    }
}

mod resolver_tests {
    use super::*;

    const ORDER_EDMX: &str = r#"<edmx:Edmx Version="1.0" xmlns:edmx="http://schemas.microsoft.com/ado/2007/06/edmx">
      <edmx:DataServices>
        <Schema Namespace="NS" xmlns="http://schemas.microsoft.com/ado/2009/11/edm">
          <EntityType Name="Order">
            <Key><PropertyRef Name="Id"/></Key>
            <Property Name="Id" Type="Edm.Int64" Nullable="false"/>
            <Property Name="Total" Type="Edm.Decimal"/>
          </EntityType>
        </Schema>
      </edmx:DataServices>
    </edmx:Edmx>"#;

    fn order_codec() -> ODataCodec {
        let metadata = EdmMetadata::parse(ORDER_EDMX).unwrap();
        codec().with_resolver(Arc::new(metadata))
    }

    #[test]
    fn test_json_properties_take_declared_types() {
        let payload = br#"{"odata.type":"NS.Order","Id":"9007199254740993","Total":"12.50"}"#;
        let entity = order_codec().decode_entity(payload, PubFormat::Json).unwrap();

        assert_eq!(
            entity.property("Id").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Int64(9_007_199_254_740_993))
        );
        assert_eq!(
            entity.property("Total").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Decimal(EdmDecimal::parse("12.50").unwrap()))
        );
    }

    #[test]
    fn test_annotation_beats_resolver() {
        let payload = br#"{"odata.type":"NS.Order","Id@odata.type":"Edm.String","Id":"A-1"}"#;
        let entity = order_codec().decode_entity(payload, PubFormat::Json).unwrap();
        assert_eq!(string_value(&entity, "Id"), "A-1");
    }

    #[test]
    fn test_undeclared_json_members_keep_value_class() {
        let payload = br#"{"odata.type":"NS.Order","Id":"1","Rush":true}"#;
        let entity = order_codec().decode_entity(payload, PubFormat::Json).unwrap();
        assert_eq!(
            entity.property("Rush").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Boolean(true))
        );
    }
}

mod media_tests {
    use super::*;

    #[test]
    fn test_atom_media_resource_entry() {
        let entry = format!(
            r#"<entry {ATOM_NS}><link rel="http://schemas.microsoft.com/ado/2007/08/dataservices/MediaResource" href="x" type="image/png"/></entry>"#
        );
        let entity = codec()
            .decode_entity(entry.as_bytes(), PubFormat::Atom)
            .unwrap();
        assert!(entity.media_entity);
        assert_eq!(entity.media_content_type.as_deref(), Some("image/png"));
        assert_eq!(entity.media_content_source.as_deref(), Some("x"));
    }
}

mod null_tests {
    use super::*;

    #[test]
    fn test_null_is_not_absent() {
        let payload = br#"{"odata.type":"NS.Person","Name":"A","Age@odata.type":"Edm.Int32","Age":null}"#;
        let entity = codec().decode_entity(payload, PubFormat::Json).unwrap();

        let age = entity.property("Age").unwrap();
        assert_eq!(
            age.value,
            PropertyValue::Null {
                type_name: Some("Edm.Int32".to_string())
            }
        );
        assert!(entity.property("Height").is_none());
    }

    #[test]
    fn test_v4_null_annotation() {
        let codec = ODataCodec::new(CodecConfig::builder().version(ODataVersion::V4).build());
        let payload = br##"{"@odata.type":"#NS.Person","Age@odata.type":"#Int32","Age":null}"##;
        let entity = codec.decode_entity(payload, PubFormat::Json).unwrap();
        assert!(entity.property("Age").unwrap().value.is_null());
    }
}

mod idempotence_tests {
    use super::*;

    #[test]
    fn test_atom_entry() {
        let codec = codec();
        let entry = format!(
            r#"<entry {ATOM_NS} xml:base="http://host/svc/" m:etag="W/&quot;3&quot;"><id>http://host/svc/Orders(1)</id><category term="NS.Order" scheme="http://schemas.microsoft.com/ado/2007/08/dataservices/scheme"/><title>Order 1</title><link rel="http://schemas.microsoft.com/ado/2007/08/dataservices/related/Customer" type="application/atom+xml;type=entry" title="Customer" href="Orders(1)/Customer"/><link rel="edit" href="Orders(1)"/><content type="application/xml"><m:properties><d:Id m:type="Edm.Int32">1</d:Id><d:Note>a &amp; b</d:Note><d:Shipped m:type="Edm.DateTime" m:null="true"/></m:properties></content></entry>"#
        );

        let first = codec.decode(entry.as_bytes(), PubFormat::Atom).unwrap();
        let bytes = codec.encode(&first, PubFormat::Atom).unwrap();
        let second = codec.decode(&bytes, PubFormat::Atom).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_atom_feed() {
        let codec = codec();
        let feed = format!(
            r#"<feed {ATOM_NS}><m:count>1</m:count><entry><id>Orders(1)</id><category term="NS.Order"/><content type="application/xml"><m:properties><d:Id m:type="Edm.Int32">1</d:Id></m:properties></content></entry><link rel="next" href="Orders?$skiptoken=1"/></feed>"#
        );

        let first = codec.decode(feed.as_bytes(), PubFormat::Atom).unwrap();
        let bytes = codec.encode(&first, PubFormat::Atom).unwrap();
        let second = codec.decode(&bytes, PubFormat::Atom).unwrap();
        assert_eq!(first, second);

        let feed = second.into_feed().unwrap();
        assert_eq!(feed.count, Some(1));
        assert_eq!(feed.next.as_deref(), Some("Orders?$skiptoken=1"));
    }

    #[test]
    fn test_json_entry() {
        let codec = codec();
        let payload = br#"{"odata.type":"NS.Order","odata.id":"Orders(1)","Customer@odata.navigationLinkUrl":"Orders(1)/Customer","Customer":{"odata.id":"Customers(7)","Name":"Alice"},"Total@odata.type":"Edm.Decimal","Total":"12.50","Tags":["a","b"]}"#;

        let first = codec.decode(payload, PubFormat::Json).unwrap();
        let bytes = codec.encode(&first, PubFormat::Json).unwrap();
        let second = codec.decode(&bytes, PubFormat::Json).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entity_through_atom() {
        let codec = codec();
        let mut entity = ODataEntity::new("NS.Person");
        entity.id = Some("http://host/svc/People(1)".to_string());
        entity.set_property(ODataProperty::new("Id", PrimitiveValue::Int32(1)));
        entity.set_property(ODataProperty::new(
            "Name",
            PrimitiveValue::String("Ada".to_string()),
        ));
        entity.set_property(ODataProperty::new("Active", PrimitiveValue::Boolean(true)));
        entity.set_property(ODataProperty::null("Age", Some("Edm.Int32")));

        let bytes = codec.encode_entity(&entity, PubFormat::Atom).unwrap();
        assert_eq!(codec.decode_entity(&bytes, PubFormat::Atom).unwrap(), entity);
    }

    #[test]
    fn test_untyped_entity_through_atom() {
        let codec = codec();
        let entity = ODataEntity::default();
        let bytes = codec.encode_entity(&entity, PubFormat::Atom).unwrap();
        assert_eq!(codec.decode_entity(&bytes, PubFormat::Atom).unwrap(), entity);

        let mut entity = ODataEntity::default();
        entity.set_property(ODataProperty::new("Id", PrimitiveValue::Int32(3)));
        let bytes = codec.encode_entity(&entity, PubFormat::Atom).unwrap();
        assert_eq!(codec.decode_entity(&bytes, PubFormat::Atom).unwrap(), entity);
    }

    #[test]
    fn test_json_resource_to_atom_keeps_value_classes() {
        let codec = codec();
        let payload = br#"{"odata.type":"NS.Order","Id":1,"Paid":false}"#;
        let resource = codec.decode(payload, PubFormat::Json).unwrap();
        let atom = codec.encode(&resource, PubFormat::Atom).unwrap();

        let entity = codec.decode_entity(&atom, PubFormat::Atom).unwrap();
        assert_eq!(
            entity.property("Id").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Int32(1))
        );
        assert_eq!(
            entity.property("Paid").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Boolean(false))
        );
    }

    #[test]
    fn test_entity_through_json() {
        let codec = codec();
        let mut entity = ODataEntity::new("NS.Person");
        entity.set_property(ODataProperty::new("Id", PrimitiveValue::Int32(1)));
        entity.set_property(ODataProperty::new(
            "Name",
            PrimitiveValue::String("Ada".to_string()),
        ));
        entity.set_property(ODataProperty::new("Active", PrimitiveValue::Boolean(false)));

        let bytes = codec.encode_entity(&entity, PubFormat::Json).unwrap();
        assert_eq!(codec.decode_entity(&bytes, PubFormat::Json).unwrap(), entity);
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_entry_without_category() {
        let entry = format!(
            r#"<entry {ATOM_NS}><id>Orders(1)</id><content type="application/xml"><m:properties/></content></entry>"#
        );
        let err = codec().decode(entry.as_bytes(), PubFormat::Atom).unwrap_err();
        assert!(matches!(err, CodecError::MissingRequiredElement(_)));
    }

    #[test]
    fn test_unresolvable_link() {
        let entry = format!(
            r#"<entry {ATOM_NS}><category term="NS.T"/><link rel="http://example.com/rels/odd" type="text/html" href="y"/><content type="application/xml"/></entry>"#
        );
        let err = codec().decode(entry.as_bytes(), PubFormat::Atom).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvableLinkType { .. }));
    }

    #[test]
    fn test_malformed_geospatial() {
        let payload = br#"{"Loc@odata.type":"Edm.GeographyPoint","Loc":{"type":"Point"}}"#;
        let err = codec().decode(payload, PubFormat::Json).unwrap_err();
        assert!(matches!(err, CodecError::MalformedGeospatialPayload(_)));
    }
}
