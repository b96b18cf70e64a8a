//! End-to-end tests: document trees in, styled shapes out.

use rustkit_svg_scene::{
    ClipGeometry, Color, FontDescriptor, FontProvider, Glyph, GradientKind, GradientUnits, Interpreter,
    InterpreterConfig, Paint, Rect, ShapeRole, SpreadMethod, StyledShape, SvgNode, TextError, Warning,
};

const TOLERANCE: f64 = 0.1;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn interpret(doc: &SvgNode) -> (Vec<StyledShape>, Vec<Warning>) {
    init_tracing();
    let mut interpreter = Interpreter::from_tree(doc, InterpreterConfig::default());
    let shapes = interpreter.build();
    (shapes, interpreter.warnings().to_vec())
}

fn svg() -> SvgNode {
    SvgNode::element("svg")
}

fn rect(x: f64, y: f64, width: f64, height: f64) -> SvgNode {
    SvgNode::element("rect")
        .attr("x", x.to_string())
        .attr("y", y.to_string())
        .attr("width", width.to_string())
        .attr("height", height.to_string())
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn assert_rect(actual: Option<Rect>, x: f64, y: f64, width: f64, height: f64) {
    let r = actual.expect("bounds");
    assert!(
        approx(r.x, x) && approx(r.y, y) && approx(r.width, width) && approx(r.height, height),
        "expected ({x}, {y}, {width}, {height}), got {r:?}"
    );
}

fn fill_color(shape: &StyledShape) -> Option<Color> {
    shape.fill.as_ref().and_then(|f| f.paint.as_color())
}

// ==================== Shapes ====================

#[test]
fn test_single_rect() {
    let doc = svg().child(rect(0.0, 0.0, 10.0, 5.0).attr("fill", "red"));
    let (shapes, warnings) = interpret(&doc);

    assert!(warnings.is_empty());
    assert_eq!(shapes.len(), 1);
    assert_rect(shapes[0].bounds(TOLERANCE), 0.0, 0.0, 10.0, 5.0);
    assert_eq!(fill_color(&shapes[0]), Some(Color::from_rgb(255, 0, 0)));
    assert_eq!(shapes[0].fill.as_ref().unwrap().opacity, 1.0);
    assert!(shapes[0].stroke.is_none());
}

#[test]
fn test_degenerate_shapes_are_skipped() {
    let doc = svg()
        .child(rect(0.0, 0.0, 0.0, 5.0))
        .child(SvgNode::element("circle").attr("r", "-1"))
        .child(SvgNode::element("path").attr("d", ""))
        .child(SvgNode::element("polyline").attr("points", "1,1"));
    let (shapes, _) = interpret(&doc);
    assert!(shapes.is_empty());
}

#[test]
fn test_display_none() {
    let doc = svg()
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("display", "none"))
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("style", "display: none"))
        .child(SvgNode::element("g").attr("display", "none").child(rect(0.0, 0.0, 1.0, 1.0)));
    let (shapes, _) = interpret(&doc);
    assert!(shapes.is_empty());
}

#[test]
fn test_duplicate_ids() {
    let doc = svg()
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("id", "a"))
        .child(rect(2.0, 0.0, 1.0, 1.0).attr("id", "a"));
    let (shapes, warnings) = interpret(&doc);

    assert_eq!(warnings, vec![Warning::DuplicateId("a".into())]);
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].id.as_deref(), Some("a"));
    assert_eq!(shapes[1].id, None);
}

#[test]
fn test_skew_is_reported_and_rest_applies() {
    let doc = svg().child(rect(0.0, 0.0, 1.0, 1.0).attr("transform", "translate(3, 4) skewY(10)"));
    let (shapes, warnings) = interpret(&doc);

    assert_eq!(warnings, vec![Warning::UnsupportedTransform("skewY".into())]);
    assert_rect(shapes[0].bounds(TOLERANCE), 3.0, 4.0, 1.0, 1.0);
}

#[test]
fn test_nested_viewport() {
    let doc = svg().child(
        SvgNode::element("svg")
            .attr("x", "10")
            .attr("y", "10")
            .attr("width", "20")
            .attr("height", "20")
            .attr("viewBox", "0 0 10 10")
            .child(rect(0.0, 0.0, 10.0, 10.0)),
    );
    let (shapes, _) = interpret(&doc);
    assert_rect(shapes[0].bounds(TOLERANCE), 10.0, 10.0, 20.0, 20.0);
}

#[test]
fn test_recursion_limit() {
    init_tracing();
    let doc = svg().child(
        SvgNode::element("g").child(SvgNode::element("g").child(SvgNode::element("g").child(rect(0.0, 0.0, 1.0, 1.0)))),
    );
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default().with_max_depth(2));
    let shapes = interpreter.build();

    assert!(shapes.is_empty());
    assert!(matches!(interpreter.warnings(), [Warning::RecursionLimit { limit: 2, .. }]));
}

#[test]
fn test_build_twice_returns_same_scene() {
    init_tracing();
    let doc = svg()
        .child(rect(0.0, 0.0, 5.0, 5.0).attr("id", "r"))
        .child(SvgNode::element("use").attr("href", "#r").attr("x", "10"))
        .child(SvgNode::element("blink"));
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());

    let first = interpreter.build();
    let elements = interpreter.index().len();
    let warnings = interpreter.warnings().to_vec();
    let second = interpreter.build();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(interpreter.index().len(), elements);
    assert_eq!(interpreter.warnings(), warnings.as_slice());
    assert_eq!(warnings, vec![Warning::UnknownElement("blink".into())]);
}

#[test]
fn test_filters_nest_innermost_first() {
    let blur = |id: &str| {
        SvgNode::element("filter")
            .attr("id", id)
            .child(SvgNode::element("feGaussianBlur").attr("stdDeviation", "1"))
    };
    let doc = svg().child(blur("f1")).child(blur("f2")).child(
        SvgNode::element("g")
            .attr("filter", "url(#f1)")
            .child(rect(0.0, 0.0, 5.0, 5.0).attr("filter", "url(#f2)")),
    );
    let (shapes, warnings) = interpret(&doc);

    assert!(warnings.is_empty());
    let ids: Vec<&str> = shapes[0].filters.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["f2", "f1"]);
}

// ==================== Paint ====================

#[test]
fn test_color_forms() {
    let doc = svg()
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("fill", "rgb(255, 0, 0)"))
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("fill", "rgb(100%, 0%, 0%)"))
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("fill", "#f00"))
        .child(SvgNode::element("g").attr("color", "green").child(rect(0.0, 0.0, 1.0, 1.0).attr("fill", "currentColor")))
        .child(SvgNode::element("g").attr("fill", "blue").child(rect(0.0, 0.0, 1.0, 1.0).attr("fill", "inherit")))
        .child(rect(0.0, 0.0, 1.0, 1.0));
    let (shapes, _) = interpret(&doc);

    let colors: Vec<Option<Color>> = shapes.iter().map(fill_color).collect();
    let red = Some(Color::from_rgb(255, 0, 0));
    assert_eq!(
        colors,
        vec![
            red,
            red,
            red,
            Some(Color::from_rgb(0, 128, 0)),
            Some(Color::from_rgb(0, 0, 255)),
            Some(Color::BLACK),
        ]
    );
}

#[test]
fn test_fill_none_and_stroke_opacity() {
    let doc = svg().child(
        rect(0.0, 0.0, 1.0, 1.0)
            .attr("fill", "none")
            .attr("stroke", "black")
            .attr("stroke-opacity", "0.5"),
    );
    let (shapes, _) = interpret(&doc);
    assert!(shapes[0].fill.is_none());
    let stroke = shapes[0].stroke.as_ref().unwrap();
    assert_eq!(stroke.opacity, 0.5);
    assert_eq!(stroke.width, 1.0);
}

#[test]
fn test_gradient_resolution() {
    init_tracing();
    let doc = svg().child(
        SvgNode::element("linearGradient")
            .attr("id", "g")
            .child(SvgNode::element("stop").attr("offset", "0").attr("stop-color", "red"))
            .child(SvgNode::element("stop").attr("offset", "1").attr("stop-color", "blue")),
    );
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());

    let Paint::Gradient(gradient) = interpreter.resolve_paint("g") else {
        panic!("expected a gradient");
    };
    assert_eq!(gradient.stops.len(), 2);
    assert_eq!(gradient.stops[0].color, Color::from_rgb(255, 0, 0));
    assert_eq!(gradient.stops[1].color, Color::from_rgb(0, 0, 255));
    assert_eq!(gradient.units, GradientUnits::ObjectBoundingBox);

    assert_eq!(interpreter.resolve_paint("missing"), Paint::None);
    assert_eq!(interpreter.warnings(), &[Warning::UnresolvedReference("missing".into())]);
}

#[test]
fn test_gradient_href_cycle() {
    init_tracing();
    let doc = svg()
        .child(
            SvgNode::element("linearGradient")
                .attr("id", "a")
                .attr("href", "#b")
                .attr("x1", "0.25")
                .attr("x2", "0.75")
                .child(SvgNode::element("stop").attr("stop-color", "red")),
        )
        .child(
            SvgNode::element("linearGradient")
                .attr("id", "b")
                .attr("href", "#a")
                .attr("x1", "0.5")
                .attr("x2", "0.6")
                .child(SvgNode::element("stop").attr("offset", "0").attr("stop-color", "blue"))
                .child(SvgNode::element("stop").attr("offset", "1").attr("stop-color", "green")),
        );
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());

    let Paint::Gradient(gradient) = interpreter.resolve_paint("a") else {
        panic!("expected a gradient");
    };
    assert_eq!(gradient.id, "a");
    assert_eq!(gradient.kind, GradientKind::Linear { x1: 0.25, y1: 0.0, x2: 0.75, y2: 0.0 });
    assert_eq!(gradient.stops.len(), 1);
    assert_eq!(gradient.stops[0].color, Color::from_rgb(255, 0, 0));
    assert!(interpreter.warnings().iter().any(|w| matches!(w, Warning::ReferenceCycle(_))));
}

#[test]
fn test_linear_gradient_fill() {
    let doc = svg()
        .child(
            SvgNode::element("linearGradient")
                .attr("id", "g")
                .attr("x1", "0")
                .attr("x2", "1")
                .child(SvgNode::element("stop").attr("offset", "0").attr("stop-color", "#fff"))
                .child(SvgNode::element("stop").attr("offset", "1").attr("stop-color", "#000")),
        )
        .child(rect(0.0, 0.0, 10.0, 10.0).attr("fill", "url(#g)"));
    let (shapes, warnings) = interpret(&doc);

    assert!(warnings.is_empty());
    let Some(Paint::Gradient(gradient)) = shapes[0].fill.as_ref().map(|f| f.paint.clone()) else {
        panic!("expected a gradient fill");
    };
    assert_eq!(gradient.stops.len(), 2);
    assert_eq!(gradient.stops[0].color, Color::WHITE);
    assert_eq!(gradient.stops[1].color, Color::BLACK);
    assert_eq!(gradient.spread, SpreadMethod::Pad);
    assert_eq!(gradient.kind, GradientKind::Linear { x1: 0.0, y1: 0.0, x2: 1.0, y2: 0.0 });
}

#[test]
fn test_bounding_box_gradient_on_shape() {
    let doc = svg()
        .child(
            SvgNode::element("linearGradient")
                .attr("id", "g")
                .child(SvgNode::element("stop").attr("stop-color", "red")),
        )
        .child(rect(10.0, 0.0, 20.0, 10.0).attr("fill", "url(#g)"));
    let (shapes, _) = interpret(&doc);

    let Some(Paint::Gradient(gradient)) = shapes[0].fill.as_ref().map(|f| f.paint.clone()) else {
        panic!("expected a gradient fill");
    };
    assert_eq!(gradient.units, GradientUnits::UserSpaceOnUse);
    assert_eq!(gradient.transform.apply(1.0, 1.0), (30.0, 10.0));
}

#[test]
fn test_paint_fallback() {
    let doc = svg().child(rect(0.0, 0.0, 1.0, 1.0).attr("fill", "url(#nope) green"));
    let (shapes, warnings) = interpret(&doc);
    assert_eq!(fill_color(&shapes[0]), Some(Color::from_rgb(0, 128, 0)));
    assert_eq!(warnings, vec![Warning::UnresolvedReference("nope".into())]);
}

// ==================== Index ====================

#[test]
fn test_attribute_inheritance() {
    init_tracing();
    let doc = svg().attr("stroke", "red").child(
        SvgNode::element("g")
            .attr("style", "fill: blue")
            .child(rect(0.0, 0.0, 1.0, 1.0).attr("id", "r").attr("opacity", "0.5")),
    );
    let interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());
    let index = interpreter.index();
    let r = index.lookup("r").unwrap();

    assert_eq!(index.resolve_attribute(r, "fill", true).as_deref(), Some("blue"));
    assert_eq!(index.resolve_attribute(r, "stroke", true).as_deref(), Some("red"));
    assert_eq!(index.resolve_attribute(r, "fill", false), None);
    assert_eq!(index.resolve_attribute(r, "opacity", false).as_deref(), Some("0.5"));
}

// ==================== Use ====================

#[test]
fn test_use_places_copy() {
    let doc = svg()
        .child(SvgNode::element("defs").child(rect(0.0, 0.0, 10.0, 10.0).attr("id", "r")))
        .child(SvgNode::element("use").attr("href", "#r").attr("x", "5").attr("y", "5").attr("fill", "blue"));
    let (shapes, warnings) = interpret(&doc);

    assert!(warnings.is_empty());
    assert_eq!(shapes.len(), 1);
    assert_rect(shapes[0].bounds(TOLERANCE), 5.0, 5.0, 10.0, 10.0);
    assert_eq!(fill_color(&shapes[0]), Some(Color::from_rgb(0, 0, 255)));
}

#[test]
fn test_use_does_not_override_target_values() {
    let doc = svg()
        .child(SvgNode::element("defs").child(rect(0.0, 0.0, 10.0, 10.0).attr("id", "r").attr("fill", "red")))
        .child(SvgNode::element("use").attr("xlink:href", "#r").attr("fill", "blue"));
    let (shapes, _) = interpret(&doc);
    assert_eq!(fill_color(&shapes[0]), Some(Color::from_rgb(255, 0, 0)));
}

#[test]
fn test_use_of_symbol() {
    let doc = svg()
        .child(
            SvgNode::element("symbol")
                .attr("id", "s")
                .attr("viewBox", "0 0 10 10")
                .child(rect(0.0, 0.0, 10.0, 10.0)),
        )
        .child(SvgNode::element("use").attr("href", "#s").attr("width", "20").attr("height", "20"));
    let (shapes, _) = interpret(&doc);

    assert_eq!(shapes.len(), 1);
    assert_rect(shapes[0].bounds(TOLERANCE), 0.0, 0.0, 20.0, 20.0);
}

#[test]
fn test_symbol_inside_used_group_is_hidden() {
    let doc = svg()
        .child(
            SvgNode::element("g")
                .attr("id", "g")
                .child(SvgNode::element("symbol").child(rect(0.0, 0.0, 10.0, 10.0)))
                .child(rect(0.0, 0.0, 1.0, 1.0)),
        )
        .child(SvgNode::element("use").attr("href", "#g").attr("x", "5"));
    let (shapes, _) = interpret(&doc);

    assert_eq!(shapes.len(), 2);
    assert_rect(shapes[0].bounds(TOLERANCE), 0.0, 0.0, 1.0, 1.0);
    assert_rect(shapes[1].bounds(TOLERANCE), 5.0, 0.0, 1.0, 1.0);
}

#[test]
fn test_use_cycles_are_broken() {
    let doc = svg()
        .child(SvgNode::element("g").attr("id", "g").child(SvgNode::element("use").attr("href", "#g")))
        .child(SvgNode::element("use").attr("id", "a").attr("href", "#b"))
        .child(SvgNode::element("use").attr("id", "b").attr("href", "#a"));
    let (shapes, warnings) = interpret(&doc);

    assert!(shapes.is_empty());
    assert!(warnings.iter().all(|w| matches!(w, Warning::ReferenceCycle(_))));
    assert!(warnings.len() >= 2);
}

#[test]
fn test_use_missing_target() {
    let doc = svg().child(SvgNode::element("use").attr("href", "#ghost"));
    let (shapes, warnings) = interpret(&doc);
    assert!(shapes.is_empty());
    assert_eq!(warnings, vec![Warning::UnresolvedReference("#ghost".into())]);
}

// ==================== Clipping ====================

#[test]
fn test_clip_union() {
    let doc = svg()
        .child(
            SvgNode::element("clipPath")
                .attr("id", "c")
                .child(rect(0.0, 0.0, 10.0, 10.0))
                .child(rect(20.0, 0.0, 10.0, 10.0)),
        )
        .child(rect(0.0, 0.0, 100.0, 100.0).attr("clip-path", "url(#c)"));
    let (shapes, _) = interpret(&doc);

    let clip = shapes[0].clip.as_ref().unwrap();
    assert_eq!(clip.shape_count(), 2);
    assert!(matches!(clip, ClipGeometry::Union(members) if members.len() == 2));
    assert_rect(clip.bounds(TOLERANCE), 0.0, 0.0, 30.0, 10.0);
}

#[test]
fn test_clip_intersection() {
    init_tracing();
    let doc = svg()
        .child(SvgNode::element("clipPath").attr("id", "outer").child(rect(5.0, 0.0, 10.0, 10.0)))
        .child(
            SvgNode::element("clipPath")
                .attr("id", "inner")
                .attr("clip-path", "url(#outer)")
                .child(rect(0.0, 0.0, 10.0, 10.0)),
        );
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());
    let clip = interpreter.resolve_clip_path("inner").unwrap();

    assert!(matches!(clip, ClipGeometry::Intersection(..)));
    assert_rect(clip.bounds(TOLERANCE), 5.0, 0.0, 5.0, 10.0);
}

#[test]
fn test_clip_member_with_own_clip() {
    init_tracing();
    let doc = svg()
        .child(SvgNode::element("clipPath").attr("id", "inner").child(rect(5.0, 0.0, 10.0, 10.0)))
        .child(
            SvgNode::element("clipPath")
                .attr("id", "c")
                .child(rect(0.0, 0.0, 10.0, 10.0).attr("clip-path", "url(#inner)"))
                .child(rect(20.0, 0.0, 10.0, 10.0)),
        );
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default());
    let clip = interpreter.resolve_clip_path("c").unwrap();

    let ClipGeometry::Union(members) = &clip else {
        panic!("expected a union, got {clip:?}");
    };
    assert_eq!(members.len(), 2);
    assert!(matches!(members[0], ClipGeometry::Intersection(..)));
    assert_rect(members[0].bounds(TOLERANCE), 5.0, 0.0, 5.0, 10.0);
    assert_rect(clip.bounds(TOLERANCE), 5.0, 0.0, 25.0, 10.0);
}

#[test]
fn test_truncated_clip_is_not_reused() {
    init_tracing();
    let doc = svg()
        .child(SvgNode::element("clipPath").attr("id", "c").child(rect(0.0, 0.0, 5.0, 5.0)))
        .child(
            SvgNode::element("g")
                .child(SvgNode::element("g").child(rect(0.0, 0.0, 10.0, 10.0).attr("clip-path", "url(#c)"))),
        )
        .child(rect(0.0, 0.0, 10.0, 10.0).attr("clip-path", "url(#c)"));
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default().with_max_depth(3));
    let shapes = interpreter.build();

    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].clip.as_ref().unwrap().shape_count(), 0);
    assert_eq!(shapes[1].clip.as_ref().unwrap().shape_count(), 1);
    assert_rect(shapes[1].clip.as_ref().unwrap().bounds(TOLERANCE), 0.0, 0.0, 5.0, 5.0);
    assert!(interpreter
        .warnings()
        .iter()
        .any(|w| matches!(w, Warning::RecursionLimit { limit: 3, .. })));
}

#[test]
fn test_clip_ignores_markers_and_debug_segments() {
    init_tracing();
    let doc = svg()
        .child(
            SvgNode::element("marker")
                .attr("id", "m")
                .attr("markerUnits", "userSpaceOnUse")
                .child(rect(0.0, 0.0, 4.0, 4.0)),
        )
        .child(
            SvgNode::element("clipPath")
                .attr("id", "c")
                .child(rect(0.0, 0.0, 10.0, 10.0))
                .child(SvgNode::element("path").attr("d", "M20,0 L30,0 L30,10").attr("marker-end", "url(#m)")),
        )
        .child(
            SvgNode::element("clipPath")
                .attr("id", "box")
                .attr("clipPathUnits", "objectBoundingBox")
                .child(rect(0.0, 0.0, 1.0, 1.0)),
        )
        .child(
            SvgNode::element("path")
                .attr("d", "M0,0 L10,0 L10,10")
                .attr("fill", "none")
                .attr("marker-end", "url(#m)")
                .attr("clip-path", "url(#box)"),
        );
    let mut interpreter = Interpreter::from_tree(&doc, InterpreterConfig::default().with_debug_segments(true));
    let shapes = interpreter.build();

    let clip = interpreter.resolve_clip_path("c").unwrap();
    assert_eq!(clip.shape_count(), 2);

    let path = shapes.iter().find(|s| s.role == ShapeRole::Geometry).unwrap();
    assert_rect(path.clip.as_ref().unwrap().bounds(TOLERANCE), 0.0, 0.0, 10.0, 10.0);
    assert!(shapes.iter().any(|s| s.role == ShapeRole::Marker));
    assert_eq!(shapes.iter().filter(|s| s.role == ShapeRole::DebugSegment).count(), 2);
}

#[test]
fn test_clip_follows_transform() {
    let doc = svg()
        .child(SvgNode::element("clipPath").attr("id", "c").child(rect(0.0, 0.0, 5.0, 5.0)))
        .child(
            SvgNode::element("g")
                .attr("transform", "translate(100, 0)")
                .child(rect(0.0, 0.0, 10.0, 10.0).attr("clip-path", "url(#c)").attr("transform", "scale(2)")),
        );
    let (shapes, _) = interpret(&doc);

    assert_rect(shapes[0].bounds(TOLERANCE), 100.0, 0.0, 20.0, 20.0);
    assert_rect(shapes[0].clip.as_ref().unwrap().bounds(TOLERANCE), 100.0, 0.0, 10.0, 10.0);
}

#[test]
fn test_clip_self_reference() {
    let doc = svg()
        .child(
            SvgNode::element("clipPath")
                .attr("id", "c")
                .attr("clip-path", "url(#c)")
                .child(rect(0.0, 0.0, 10.0, 10.0)),
        )
        .child(rect(0.0, 0.0, 50.0, 50.0).attr("clip-path", "url(#c)"));
    let (shapes, warnings) = interpret(&doc);

    assert_eq!(shapes.len(), 1);
    assert_rect(shapes[0].clip.as_ref().unwrap().bounds(TOLERANCE), 0.0, 0.0, 10.0, 10.0);
    assert!(warnings.contains(&Warning::ReferenceCycle("c".into())));
}

#[test]
fn test_clip_path_to_non_clip_element() {
    let doc = svg()
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("id", "notclip"))
        .child(rect(0.0, 0.0, 1.0, 1.0).attr("clip-path", "url(#notclip)"));
    let (shapes, warnings) = interpret(&doc);
    assert_eq!(shapes.len(), 2);
    assert!(shapes[1].clip.is_none());
    assert_eq!(warnings, vec![Warning::InvalidClipPath("notclip".into())]);
}

// ==================== Markers ====================

#[test]
fn test_marker_orient_auto() {
    let doc = svg()
        .child(
            SvgNode::element("marker")
                .attr("id", "arrow")
                .attr("orient", "auto")
                .attr("markerUnits", "userSpaceOnUse")
                .child(rect(0.0, -1.0, 4.0, 2.0)),
        )
        .child(
            SvgNode::element("path")
                .attr("d", "M0,0 L10,0 L10,10")
                .attr("fill", "none")
                .attr("marker-end", "url(#arrow)"),
        );
    let (shapes, _) = interpret(&doc);

    assert_eq!(shapes.len(), 2);
    assert_rect(shapes[1].bounds(TOLERANCE), 9.0, 10.0, 2.0, 4.0);
}

#[test]
fn test_mid_markers_at_subpath_start() {
    let doc = svg()
        .child(
            SvgNode::element("marker")
                .attr("id", "dot")
                .attr("markerUnits", "userSpaceOnUse")
                .attr("refX", "1")
                .attr("refY", "1")
                .child(rect(0.0, 0.0, 2.0, 2.0)),
        )
        .child(
            SvgNode::element("path")
                .attr("d", "M0 0 L10 0 M20 0 L30 0")
                .attr("fill", "none")
                .attr("stroke", "black")
                .attr("marker-mid", "url(#dot)"),
        );
    let (shapes, _) = interpret(&doc);

    let markers: Vec<&StyledShape> = shapes.iter().filter(|s| s.role == ShapeRole::Marker).collect();
    assert_eq!(markers.len(), 2);
    assert_rect(markers[0].bounds(TOLERANCE), 9.0, -1.0, 2.0, 2.0);
    assert_rect(markers[1].bounds(TOLERANCE), 19.0, -1.0, 2.0, 2.0);
}

// ==================== Text ====================

#[test]
fn test_text_spans_continue_pen() {
    let doc = svg().child(
        SvgNode::element("text")
            .attr("x", "0")
            .attr("y", "10")
            .attr("font-size", "10")
            .child(SvgNode::text("  A "))
            .child(SvgNode::element("tspan").attr("fill", "red").child(SvgNode::text("B"))),
    );
    let (shapes, _) = interpret(&doc);

    assert_eq!(shapes.len(), 2);
    assert_rect(shapes[0].bounds(TOLERANCE), 0.0, 3.0, 5.0, 7.0);
    assert_rect(shapes[1].bounds(TOLERANCE), 10.0, 3.0, 5.0, 7.0);
    assert_eq!(fill_color(&shapes[1]), Some(Color::from_rgb(255, 0, 0)));
}

#[test]
fn test_text_anchor_middle() {
    let doc = svg().child(
        SvgNode::element("text")
            .attr("x", "50")
            .attr("font-size", "10")
            .attr("text-anchor", "middle")
            .child(SvgNode::text("AB")),
    );
    let (shapes, _) = interpret(&doc);
    assert_rect(shapes[0].bounds(TOLERANCE), 45.0, -7.0, 10.0, 7.0);
}

#[test]
fn test_text_anchor_spans_whole_chunk() {
    let doc = svg().child(
        SvgNode::element("text")
            .attr("x", "50")
            .attr("font-size", "10")
            .attr("text-anchor", "middle")
            .child(SvgNode::text("A"))
            .child(SvgNode::element("tspan").child(SvgNode::text("B"))),
    );
    let (shapes, _) = interpret(&doc);

    assert_eq!(shapes.len(), 2);
    assert_rect(shapes[0].bounds(TOLERANCE), 45.0, -7.0, 5.0, 7.0);
    assert_rect(shapes[1].bounds(TOLERANCE), 50.0, -7.0, 5.0, 7.0);
}

#[test]
fn test_relative_font_size_uses_parent() {
    let doc = svg().child(
        SvgNode::element("g")
            .attr("font-size", "20")
            .child(SvgNode::element("text").attr("font-size", "50%").child(SvgNode::text("A"))),
    );
    let (shapes, _) = interpret(&doc);

    assert_eq!(shapes.len(), 1);
    assert_rect(shapes[0].bounds(TOLERANCE), 0.0, -7.0, 5.0, 7.0);
}

#[test]
fn test_text_path_spacing_and_glyphs() {
    let doc = svg()
        .child(SvgNode::element("defs").child(SvgNode::element("path").attr("id", "p").attr("d", "M0,0 L100,0")))
        .child(
            SvgNode::element("text").attr("font-size", "10").child(
                SvgNode::element("textPath")
                    .attr("href", "#p")
                    .attr("textLength", "50")
                    .attr("lengthAdjust", "spacingAndGlyphs")
                    .child(SvgNode::text("ABCD")),
            ),
        );
    let (shapes, warnings) = interpret(&doc);

    assert!(warnings.is_empty());
    assert_eq!(shapes.len(), 1);
    assert_rect(shapes[0].bounds(TOLERANCE), 0.0, -7.0, 50.0, 7.0);
}

struct MissingFonts;

impl FontProvider for MissingFonts {
    fn glyphs(&self, font: &FontDescriptor, _text: &str) -> Result<Vec<Glyph>, TextError> {
        Err(TextError::FontNotFound(font.family.clone()))
    }
}

#[test]
fn test_font_failure_is_a_warning() {
    init_tracing();
    let doc = svg()
        .child(SvgNode::element("text").attr("font-family", "Nowhere").child(SvgNode::text("x")))
        .child(rect(0.0, 0.0, 1.0, 1.0));
    let mut interpreter =
        Interpreter::from_tree(&doc, InterpreterConfig::default()).with_font_provider(MissingFonts);
    let shapes = interpreter.build();

    assert_eq!(shapes.len(), 1);
    assert_eq!(
        interpreter.warnings(),
        &[Warning::FontFailure(TextError::FontNotFound("Nowhere".into()))]
    );
}
