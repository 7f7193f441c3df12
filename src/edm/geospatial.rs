//! Geospatial values and their GeoJSON / GML encodings

use serde_json::{Map, Value, json};

use crate::constants::{
    GEOJSON_COORDINATES, GEOJSON_CRS, GEOJSON_GEOMETRIES, GEOJSON_TYPE, NS_GML,
};
use crate::edm::simple_type::EdmSimpleType;
use crate::error::{CodecError, Result};
use crate::tree::Element;

const SRS_NAME_PREFIX: &str = "http://www.opengis.net/def/crs/EPSG/0/";

/// Geography (round earth) or geometry (flat earth)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Geography,
    Geometry,
}

/// A coordinate tuple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }
}

/// Shape of a geospatial value
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Position),
    LineString(Vec<Position>),
    /// Exterior ring followed by interior rings
    Polygon(Vec<Vec<Position>>),
    MultiPoint(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    Collection(Vec<Shape>),
}

impl Shape {
    /// GeoJSON `type` member for this shape
    pub fn geojson_name(&self) -> &'static str {
        match self {
            Shape::Point(_) => "Point",
            Shape::LineString(_) => "LineString",
            Shape::Polygon(_) => "Polygon",
            Shape::MultiPoint(_) => "MultiPoint",
            Shape::MultiLineString(_) => "MultiLineString",
            Shape::MultiPolygon(_) => "MultiPolygon",
            Shape::Collection(_) => "GeometryCollection",
        }
    }

    fn wkt_name(&self) -> &'static str {
        match self {
            Shape::Point(_) => "POINT",
            Shape::LineString(_) => "LINESTRING",
            Shape::Polygon(_) => "POLYGON",
            Shape::MultiPoint(_) => "MULTIPOINT",
            Shape::MultiLineString(_) => "MULTILINESTRING",
            Shape::MultiPolygon(_) => "MULTIPOLYGON",
            Shape::Collection(_) => "GEOMETRYCOLLECTION",
        }
    }
}

/// A geospatial value: dimension, shape and optional spatial reference id
#[derive(Debug, Clone, PartialEq)]
pub struct Geospatial {
    pub dimension: Dimension,
    pub shape: Shape,
    pub srid: Option<u32>,
}

impl Geospatial {
    pub fn new(dimension: Dimension, shape: Shape) -> Self {
        Self {
            dimension,
            shape,
            srid: None,
        }
    }

    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    /// The concrete Edm type of this value
    pub fn edm_type(&self) -> EdmSimpleType {
        use EdmSimpleType as T;
        match (self.dimension, &self.shape) {
            (Dimension::Geography, Shape::Point(_)) => T::GeographyPoint,
            (Dimension::Geography, Shape::LineString(_)) => T::GeographyLineString,
            (Dimension::Geography, Shape::Polygon(_)) => T::GeographyPolygon,
            (Dimension::Geography, Shape::MultiPoint(_)) => T::GeographyMultiPoint,
            (Dimension::Geography, Shape::MultiLineString(_)) => T::GeographyMultiLineString,
            (Dimension::Geography, Shape::MultiPolygon(_)) => T::GeographyMultiPolygon,
            (Dimension::Geography, Shape::Collection(_)) => T::GeographyCollection,
            (Dimension::Geometry, Shape::Point(_)) => T::GeometryPoint,
            (Dimension::Geometry, Shape::LineString(_)) => T::GeometryLineString,
            (Dimension::Geometry, Shape::Polygon(_)) => T::GeometryPolygon,
            (Dimension::Geometry, Shape::MultiPoint(_)) => T::GeometryMultiPoint,
            (Dimension::Geometry, Shape::MultiLineString(_)) => T::GeometryMultiLineString,
            (Dimension::Geometry, Shape::MultiPolygon(_)) => T::GeometryMultiPolygon,
            (Dimension::Geometry, Shape::Collection(_)) => T::GeometryCollection,
        }
    }

    /// Decode a GeoJSON object declared as `edm_type`
    ///
    /// Abstract `Geography`/`Geometry` take their shape from the GeoJSON
    /// `type` member.
    pub fn from_geojson(edm_type: EdmSimpleType, value: &Value) -> Result<Self> {
        let dimension = dimension_of(edm_type)?;
        let obj = value.as_object().ok_or_else(|| {
            CodecError::MalformedGeospatialPayload(format!("{edm_type} value is not an object"))
        })?;
        let kind = match obj.get(GEOJSON_TYPE).and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None if !edm_type.is_abstract_geospatial() => shape_name_of(edm_type).to_string(),
            None => {
                return Err(CodecError::MalformedGeospatialPayload(format!(
                    "{edm_type} value has no 'type' member"
                )));
            }
        };
        let shape = shape_from_geojson(&kind, obj)?;
        let srid = obj.get(GEOJSON_CRS).and_then(srid_from_crs);

        let geo = Geospatial {
            dimension,
            shape,
            srid,
        };
        if !edm_type.is_abstract_geospatial() && geo.edm_type() != edm_type {
            return Err(CodecError::MalformedGeospatialPayload(format!(
                "expected {edm_type}, found GeoJSON type {kind}"
            )));
        }
        Ok(geo)
    }

    /// Encode as a GeoJSON object
    pub fn to_geojson(&self) -> Value {
        let mut obj = shape_to_geojson(&self.shape);
        if let Some(srid) = self.srid {
            obj.insert(
                GEOJSON_CRS.to_string(),
                json!({"type": "name", "properties": {"name": format!("EPSG:{srid}")}}),
            );
        }
        Value::Object(obj)
    }

    /// Decode from a property element whose single child is a GML shape
    pub fn from_gml(edm_type: EdmSimpleType, property: &Element) -> Result<Self> {
        let dimension = dimension_of(edm_type)?;
        let shape_elem = property.child_elements().next().ok_or_else(|| {
            CodecError::MalformedGeospatialPayload(format!(
                "{edm_type} property {} has no GML content",
                property.name
            ))
        })?;
        let srid = shape_elem
            .attr(Some(NS_GML), "srsName")
            .or_else(|| shape_elem.attr(None, "srsName"))
            .and_then(srid_from_srs_name);
        let geo = Geospatial {
            dimension,
            shape: shape_from_gml(shape_elem)?,
            srid,
        };
        if !edm_type.is_abstract_geospatial() && geo.edm_type() != edm_type {
            return Err(CodecError::MalformedGeospatialPayload(format!(
                "expected {edm_type}, found gml:{}",
                shape_elem.name
            )));
        }
        Ok(geo)
    }

    /// Encode as a GML shape element
    pub fn to_gml(&self) -> Element {
        let mut elem = shape_to_gml(&self.shape);
        if let Some(srid) = self.srid {
            elem.set_attr(Some(NS_GML), "srsName", format!("{SRS_NAME_PREFIX}{srid}"));
        }
        elem
    }
}

impl std::fmt::Display for Geospatial {
    /// Well-known text, prefixed with `SRID=n;` when a reference system is set
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(srid) = self.srid {
            write!(f, "SRID={srid};")?;
        }
        write!(f, "{}", wkt(&self.shape))
    }
}

fn dimension_of(edm_type: EdmSimpleType) -> Result<Dimension> {
    let name = edm_type.name();
    if name.starts_with("Geography") {
        Ok(Dimension::Geography)
    } else if name.starts_with("Geometry") {
        Ok(Dimension::Geometry)
    } else {
        Err(CodecError::MalformedGeospatialPayload(format!(
            "{edm_type} is not a geospatial type"
        )))
    }
}

fn shape_name_of(edm_type: EdmSimpleType) -> &'static str {
    let name = edm_type.name();
    let rest = name
        .strip_prefix("Geography")
        .or_else(|| name.strip_prefix("Geometry"))
        .unwrap_or(name);
    match rest {
        "Collection" => "GeometryCollection",
        other => other,
    }
}

fn malformed(msg: impl Into<String>) -> CodecError {
    CodecError::MalformedGeospatialPayload(msg.into())
}

fn required<'a>(obj: &'a Map<String, Value>, member: &str, kind: &str) -> Result<&'a Value> {
    obj.get(member)
        .ok_or_else(|| malformed(format!("{kind} is missing '{member}'")))
}

fn shape_from_geojson(kind: &str, obj: &Map<String, Value>) -> Result<Shape> {
    if kind == "GeometryCollection" || kind == "Collection" {
        let members = required(obj, GEOJSON_GEOMETRIES, kind)?
            .as_array()
            .ok_or_else(|| malformed("'geometries' is not an array"))?;
        let mut shapes = Vec::with_capacity(members.len());
        for member in members {
            let member_obj = member
                .as_object()
                .ok_or_else(|| malformed("collection member is not an object"))?;
            let member_kind = member_obj
                .get(GEOJSON_TYPE)
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("collection member has no 'type'"))?;
            shapes.push(shape_from_geojson(member_kind, member_obj)?);
        }
        return Ok(Shape::Collection(shapes));
    }

    let coords = required(obj, GEOJSON_COORDINATES, kind)?;
    match kind {
        "Point" => Ok(Shape::Point(position(coords)?)),
        "LineString" => Ok(Shape::LineString(positions(coords)?)),
        "Polygon" => Ok(Shape::Polygon(rings(coords)?)),
        "MultiPoint" => Ok(Shape::MultiPoint(positions(coords)?)),
        "MultiLineString" => Ok(Shape::MultiLineString(rings(coords)?)),
        "MultiPolygon" => {
            let polys = array(coords)?
                .iter()
                .map(rings)
                .collect::<Result<Vec<_>>>()?;
            Ok(Shape::MultiPolygon(polys))
        }
        other => Err(malformed(format!("unknown GeoJSON type '{other}'"))),
    }
}

fn array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| malformed(format!("expected coordinate array, found {value}")))
}

fn position(value: &Value) -> Result<Position> {
    let nums = array(value)?;
    if !(2..=3).contains(&nums.len()) {
        return Err(malformed(format!(
            "a position needs 2 or 3 coordinates, found {}",
            nums.len()
        )));
    }
    let coord = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| malformed(format!("coordinate {v} is not a number")))
    };
    Ok(Position {
        x: coord(&nums[0])?,
        y: coord(&nums[1])?,
        z: nums.get(2).map(coord).transpose()?,
    })
}

fn positions(value: &Value) -> Result<Vec<Position>> {
    array(value)?.iter().map(position).collect()
}

fn rings(value: &Value) -> Result<Vec<Vec<Position>>> {
    array(value)?.iter().map(positions).collect()
}

fn position_json(p: &Position) -> Value {
    match p.z {
        Some(z) => json!([p.x, p.y, z]),
        None => json!([p.x, p.y]),
    }
}

fn positions_json(ps: &[Position]) -> Value {
    Value::Array(ps.iter().map(position_json).collect())
}

fn rings_json(rings: &[Vec<Position>]) -> Value {
    Value::Array(rings.iter().map(|r| positions_json(r)).collect())
}

fn shape_to_geojson(shape: &Shape) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(GEOJSON_TYPE.to_string(), json!(shape.geojson_name()));
    match shape {
        Shape::Collection(members) => {
            let geometries = members
                .iter()
                .map(|m| Value::Object(shape_to_geojson(m)))
                .collect();
            obj.insert(GEOJSON_GEOMETRIES.to_string(), Value::Array(geometries));
        }
        Shape::Point(p) => {
            obj.insert(GEOJSON_COORDINATES.to_string(), position_json(p));
        }
        Shape::LineString(ps) | Shape::MultiPoint(ps) => {
            obj.insert(GEOJSON_COORDINATES.to_string(), positions_json(ps));
        }
        Shape::Polygon(rs) | Shape::MultiLineString(rs) => {
            obj.insert(GEOJSON_COORDINATES.to_string(), rings_json(rs));
        }
        Shape::MultiPolygon(polys) => {
            let coords = polys.iter().map(|p| rings_json(p)).collect();
            obj.insert(GEOJSON_COORDINATES.to_string(), Value::Array(coords));
        }
    }
    obj
}

fn srid_from_crs(crs: &Value) -> Option<u32> {
    let name = crs.get("properties")?.get("name")?.as_str()?;
    name.rsplit(':').next()?.parse().ok()
}

fn srid_from_srs_name(name: &str) -> Option<u32> {
    name.rsplit(['/', ':']).next()?.parse().ok()
}

// GML

fn gml(name: &str) -> Element {
    Element::new(Some(NS_GML), name)
}

fn pos_element(p: &Position) -> Element {
    let text = match p.z {
        Some(z) => format!("{} {} {}", p.x, p.y, z),
        None => format!("{} {}", p.x, p.y),
    };
    gml("pos").with_text(text)
}

fn point_gml(p: &Position) -> Element {
    gml("Point").with_child(pos_element(p))
}

fn line_gml(ps: &[Position]) -> Element {
    let mut line = gml("LineString");
    for p in ps {
        line.push_element(pos_element(p));
    }
    line
}

fn polygon_gml(rings: &[Vec<Position>]) -> Element {
    let mut poly = gml("Polygon");
    for (idx, ring) in rings.iter().enumerate() {
        let mut linear = gml("LinearRing");
        for p in ring {
            linear.push_element(pos_element(p));
        }
        let wrapper = if idx == 0 { "exterior" } else { "interior" };
        poly.push_element(gml(wrapper).with_child(linear));
    }
    poly
}

fn shape_to_gml(shape: &Shape) -> Element {
    match shape {
        Shape::Point(p) => point_gml(p),
        Shape::LineString(ps) => line_gml(ps),
        Shape::Polygon(rings) => polygon_gml(rings),
        Shape::MultiPoint(ps) => {
            let mut members = gml("pointMembers");
            for p in ps {
                members.push_element(point_gml(p));
            }
            gml("MultiPoint").with_child(members)
        }
        Shape::MultiLineString(lines) => {
            let mut members = gml("curveMembers");
            for line in lines {
                members.push_element(line_gml(line));
            }
            gml("MultiCurve").with_child(members)
        }
        Shape::MultiPolygon(polys) => {
            let mut members = gml("surfaceMembers");
            for poly in polys {
                members.push_element(polygon_gml(poly));
            }
            gml("MultiSurface").with_child(members)
        }
        Shape::Collection(shapes) => {
            let mut members = gml("geometryMembers");
            for shape in shapes {
                members.push_element(shape_to_gml(shape));
            }
            gml("MultiGeometry").with_child(members)
        }
    }
}

fn parse_pos(elem: &Element) -> Result<Position> {
    let text = elem.text();
    let nums = text
        .split_whitespace()
        .map(|n| {
            n.parse::<f64>()
                .map_err(|_| malformed(format!("coordinate '{n}' is not a number")))
        })
        .collect::<Result<Vec<_>>>()?;
    match nums.as_slice() {
        [x, y] => Ok(Position::new(*x, *y)),
        [x, y, z] => Ok(Position {
            x: *x,
            y: *y,
            z: Some(*z),
        }),
        _ => Err(malformed(format!(
            "gml:pos needs 2 or 3 coordinates, found '{}'",
            text.trim()
        ))),
    }
}

fn gml_positions(elem: &Element) -> Result<Vec<Position>> {
    elem.child_elements()
        .filter(|c| c.name == "pos")
        .map(parse_pos)
        .collect()
}

fn gml_point(elem: &Element) -> Result<Position> {
    let pos = elem
        .find_child(Some(NS_GML), "pos")
        .ok_or_else(|| malformed("gml:Point has no gml:pos"))?;
    parse_pos(pos)
}

fn gml_polygon(elem: &Element) -> Result<Vec<Vec<Position>>> {
    let mut rings = Vec::new();
    for wrapper in elem.child_elements() {
        let ring = wrapper
            .find_child(Some(NS_GML), "LinearRing")
            .ok_or_else(|| malformed(format!("gml:{} has no gml:LinearRing", wrapper.name)))?;
        rings.push(gml_positions(ring)?);
    }
    if rings.is_empty() {
        return Err(malformed("gml:Polygon has no rings"));
    }
    Ok(rings)
}

fn gml_members<'a>(elem: &'a Element, wrapper: &str) -> Result<impl Iterator<Item = &'a Element>> {
    let members = elem
        .find_child(Some(NS_GML), wrapper)
        .ok_or_else(|| malformed(format!("gml:{} is missing gml:{wrapper}", elem.name)))?;
    Ok(members.child_elements())
}

fn shape_from_gml(elem: &Element) -> Result<Shape> {
    match elem.name.as_str() {
        "Point" => Ok(Shape::Point(gml_point(elem)?)),
        "LineString" => Ok(Shape::LineString(gml_positions(elem)?)),
        "Polygon" => Ok(Shape::Polygon(gml_polygon(elem)?)),
        "MultiPoint" => Ok(Shape::MultiPoint(
            gml_members(elem, "pointMembers")?
                .map(gml_point)
                .collect::<Result<_>>()?,
        )),
        "MultiCurve" | "MultiLineString" => Ok(Shape::MultiLineString(
            gml_members(elem, "curveMembers")?
                .map(gml_positions)
                .collect::<Result<_>>()?,
        )),
        "MultiSurface" | "MultiPolygon" => Ok(Shape::MultiPolygon(
            gml_members(elem, "surfaceMembers")?
                .map(gml_polygon)
                .collect::<Result<_>>()?,
        )),
        "MultiGeometry" => Ok(Shape::Collection(
            gml_members(elem, "geometryMembers")?
                .map(shape_from_gml)
                .collect::<Result<_>>()?,
        )),
        other => Err(malformed(format!("unknown GML element gml:{other}"))),
    }
}

// WKT

fn wkt_pos(p: &Position) -> String {
    match p.z {
        Some(z) => format!("{} {} {}", p.x, p.y, z),
        None => format!("{} {}", p.x, p.y),
    }
}

fn wkt_list(ps: &[Position]) -> String {
    let parts: Vec<String> = ps.iter().map(wkt_pos).collect();
    format!("({})", parts.join(", "))
}

fn wkt_rings(rings: &[Vec<Position>]) -> String {
    let parts: Vec<String> = rings.iter().map(|r| wkt_list(r)).collect();
    format!("({})", parts.join(", "))
}

fn wkt(shape: &Shape) -> String {
    let body = match shape {
        Shape::Point(p) => format!("({})", wkt_pos(p)),
        Shape::LineString(ps) | Shape::MultiPoint(ps) => wkt_list(ps),
        Shape::Polygon(rings) | Shape::MultiLineString(rings) => wkt_rings(rings),
        Shape::MultiPolygon(polys) => {
            let parts: Vec<String> = polys.iter().map(|p| wkt_rings(p)).collect();
            format!("({})", parts.join(", "))
        }
        Shape::Collection(shapes) => {
            let parts: Vec<String> = shapes.iter().map(wkt).collect();
            format!("({})", parts.join(", "))
        }
    };
    format!("{}{}", shape.wkt_name(), body)
}
