//! Filter effects as data. Nothing here executes a filter.

use crate::index::{ElementId, ElementIndex, Tag};
use crate::paint::{current_color, parse_color, Color, GradientUnits};
use crate::parse::{parse_number_list, parse_opacity, Length, Unit};

/// One filter primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPrimitive {
    GaussianBlur { std_dev_x: f64, std_dev_y: f64 },
    Offset { dx: f64, dy: f64 },
    /// `flood-opacity` is folded into the color.
    Flood { color: Color },
    /// Any other primitive, with its attributes sorted by name.
    Other { name: String, attributes: Vec<(String, String)> },
}

/// A primitive with its `in`/`result` wiring.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEffect {
    pub primitive: FilterPrimitive,
    pub input: Option<String>,
    pub result: Option<String>,
}

/// A `filter` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub id: String,
    pub units: GradientUnits,
    pub primitive_units: GradientUnits,
    /// Filter region `(x, y, width, height)` in `units`.
    pub region: (Length, Length, Length, Length),
    pub effects: Vec<FilterEffect>,
}

/// Read the `filter` element `element`. Returns `None` for other tags.
pub fn read_filter(index: &ElementIndex, element: ElementId, id: &str) -> Option<Filter> {
    let el = index.element(element);
    if el.tag != Tag::Filter {
        return None;
    }
    let length = |name: &str, default: f64| {
        el.attribute(name)
            .and_then(Length::parse)
            .unwrap_or(Length::new(default, Unit::Percent))
    };
    let effects = el
        .children()
        .iter()
        .filter_map(|&child| read_effect(index, child))
        .collect();

    Some(Filter {
        id: id.to_string(),
        units: el
            .attribute("filterUnits")
            .and_then(GradientUnits::parse)
            .unwrap_or(GradientUnits::ObjectBoundingBox),
        primitive_units: el
            .attribute("primitiveUnits")
            .and_then(GradientUnits::parse)
            .unwrap_or(GradientUnits::UserSpaceOnUse),
        region: (
            length("x", -10.0),
            length("y", -10.0),
            length("width", 120.0),
            length("height", 120.0),
        ),
        effects,
    })
}

fn read_effect(index: &ElementIndex, element: ElementId) -> Option<FilterEffect> {
    let el = index.element(element);
    let Tag::FilterPrimitive(name) = &el.tag else {
        return None;
    };
    let number = |attr: &str| el.attribute(attr).and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or(0.0);

    let primitive = match name.as_str() {
        "feGaussianBlur" => {
            let values = el.attribute("stdDeviation").map(parse_number_list).unwrap_or_default();
            let x = values.first().copied().unwrap_or(0.0).max(0.0);
            let y = values.get(1).copied().unwrap_or(x).max(0.0);
            FilterPrimitive::GaussianBlur { std_dev_x: x, std_dev_y: y }
        }
        "feOffset" => FilterPrimitive::Offset { dx: number("dx"), dy: number("dy") },
        "feFlood" => {
            let opacity = index
                .resolve_attribute(element, "flood-opacity", false)
                .and_then(|o| parse_opacity(&o))
                .unwrap_or(1.0);
            let color = match index.resolve_attribute(element, "flood-color", false) {
                Some(c) if c.trim().eq_ignore_ascii_case("currentcolor") => current_color(index, element),
                Some(c) => parse_color(&c).unwrap_or(Color::BLACK),
                None => Color::BLACK,
            };
            FilterPrimitive::Flood { color: color.with_opacity(opacity) }
        }
        other => {
            let mut attributes: Vec<(String, String)> = el
                .attributes()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            attributes.sort();
            FilterPrimitive::Other { name: other.to_string(), attributes }
        }
    };

    Some(FilterEffect {
        primitive,
        input: el.attribute("in").map(str::to_string),
        result: el.attribute("result").map(str::to_string),
    })
}
