//! Text rendering of generator trees.
//!
//! Output is Flow-annotated JavaScript. Every validator is an expression: a
//! runtime function name, a bound runtime call, or an inline arrow function.
//! Field chains nest each following field inside the previous field's success
//! branch, so scopes close where they open.
use crate::ir::{Field, Generator, Sentinel, TypeExpr};

const INDENT: &str = "  ";

// ————————————————————————————————————————————————————————————————————————————
// WRITER
// ————————————————————————————————————————————————————————————————————————————

/// Line writer with block depth. Multi-line text passed to [`Code::line`] is
/// indented as a unit, which is how nested validators get embedded.
#[derive(Default)]
struct Code {
    out: String,
    depth: usize,
}

impl Code {
    fn line(&mut self, text: &str) {
        for l in text.lines() {
            if !l.is_empty() {
                for _ in 0..self.depth {
                    self.out.push_str(INDENT);
                }
                self.out.push_str(l);
            }
            self.out.push('\n');
        }
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    fn finish(mut self) -> String {
        while self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

/// Source text of the validator expression for `de`.
pub fn render(de: &Generator) -> String {
    match de {
        Generator::Bool => "deBool".to_string(),
        Generator::Number => "deNumber".to_string(),
        Generator::String | Generator::FilePath => "deString".to_string(),
        Generator::Value { ty, value } => render_value(ty, value),
        Generator::Enum { ty, values } => render_enum(ty, values),
        Generator::Object { ty, fields, optional } => render_object(ty, fields, optional),
        Generator::List { element } => format!("deList.bind(null, {})", render(element)),
        Generator::Mapping { key, value } => {
            format!("deMapping.bind(null, {}, {})", render(key), render(value))
        }
        Generator::Sum { ty, .. } => refine_name(ty),
        Generator::Custom { import, .. } => import.clone(),
    }
}

fn render_value(ty: &str, value: &serde_json::Value) -> String {
    let literal = value.to_string();
    let mut code = Code::default();
    code.open("(x: mixed) => {");
    code.open(&format!("if(typeof x != {}) {{", js_str(ty)));
    code.line(&format!(
        "return new Error('Could not deserialize \"' + String(x) + {})",
        js_str(&format!("\" into a {ty}.")),
    ));
    code.close("}");
    code.open(&format!("else if(x === {literal}) {{"));
    code.line("return x");
    code.close("}");
    code.open("else {");
    code.line(&format!(
        "return new Error('Could not deserialize \"' + String(x) + {})",
        js_str(&format!("\" into a {ty} with the value {literal}.")),
    ));
    code.close("}");
    code.close("}");
    code.finish()
}

fn render_enum(ty: &TypeExpr, values: &[String]) -> String {
    let check = if values.is_empty() {
        "false".to_string()
    } else {
        values
            .iter()
            .map(|v| format!("either === {}", js_str(v)))
            .collect::<Vec<_>>()
            .join(" || ")
    };
    let mut code = Code::default();
    code.open(&format!("(v: mixed): {ty} | Error => {{"));
    code.line(&format!("const either = {}(v)", render(&Generator::String)));
    code.open("if(either instanceof Error) {");
    code.line(&format!(
        "return new Error('Could not deserialize \"' + String(v) + {} + either.message)",
        js_str(&format!("\" into enum \"{ty}\": ")),
    ));
    code.close("}");
    code.open("else {");
    code.open(&format!("if({check}) {{"));
    code.line("return either");
    code.close("}");
    code.open("else {");
    code.line(&format!(
        "return new Error('Could not deserialize \"' + String(v) + {})",
        js_str(&format!("\" into one of the enum values: {}", values.join(", "))),
    ));
    code.close("}");
    code.close("}");
    code.close("}");
    code.finish()
}

fn render_object(ty: &TypeExpr, fields: &[Field], optional: &[Field]) -> String {
    let chain = fields
        .iter()
        .map(|f| (f, false))
        .chain(optional.iter().map(|f| (f, true)))
        .collect::<Vec<_>>();
    let mut code = Code::default();
    code.open(&format!("(json: mixed): {ty} | Error => {{"));
    code.open("if(json === null) {");
    code.line("return new Error('Could not deserialize json because the value is null.')");
    code.close("}");
    code.open("else if(typeof json == 'undefined') {");
    code.line("return new Error('Could not deserialize json because the value is undefined.')");
    code.close("}");
    code.open("else if(json instanceof Error || typeof json != 'object') {");
    code.line("return new Error('Could not deserialize object \"' + String(json) + '\"')");
    code.close("}");
    code.open("else {");
    render_field_chain(&mut code, ty, &chain, &chain);
    code.close("}");
    code.close("}");
    code.finish()
}

/// Validate `rest[0]`, then everything after it inside its success branch.
/// Once the chain is empty the record is built from all bindings.
fn render_field_chain(code: &mut Code, ty: &TypeExpr, all: &[(&Field, bool)], rest: &[(&Field, bool)]) {
    let Some(((field, optional), tail)) = rest.split_first() else {
        if all.is_empty() {
            code.line(&format!("const result: {ty} = {{}}"));
        } else {
            code.open(&format!("const result: {ty} = {{"));
            for (f, _) in all {
                code.line(&format!("{},", f.name));
            }
            code.close("}");
        }
        code.line("return result");
        return;
    };
    let name = &field.name;
    let call = format!("deField({}, ({}), json.{name})", js_str(name), render(&field.de));
    if *optional {
        code.line(&format!(
            "const {name} = !Object.prototype.hasOwnProperty.call(json, {}) || json.{name} == null ? undefined : {call}",
            js_str(name),
        ));
    } else {
        code.line(&format!("const {name} = {call}"));
    }
    code.open(&format!("if({name} instanceof Error) {{"));
    code.line(&format!("const fieldError: Error = {name}"));
    code.line(&format!(
        "return new Error({} + fieldError.message)",
        js_str(&format!("Could not deserialize field \"{name}\": ")),
    ));
    code.close("}");
    code.open("else {");
    render_field_chain(code, ty, all, tail);
    code.close("}");
}

/// Name of the hoisted refinement function for a sum type.
pub fn refine_name(ty: &TypeExpr) -> String {
    format!("{}Refine", ty.base_name().unwrap_or("Sum"))
}

/// The free-standing declaration backing a sum generator.
pub fn refine_hoist(
    ty: &TypeExpr,
    discriminant: &str,
    discriminant_type: &TypeExpr,
    variants: &[Sentinel],
) -> String {
    let tag = Generator::Enum {
        ty: discriminant_type.clone(),
        values: variants.iter().map(|v| v.key.clone()).collect(),
    };
    let mut code = Code::default();
    code.open(&format!("const {} = (x: mixed): {ty} | Error => {{", refine_name(ty)));
    code.open(&format!(
        "if(x != null && typeof x == 'object' && x.hasOwnProperty({}) && typeof x.{discriminant} == 'string') {{",
        js_str(discriminant),
    ));
    code.line(&format!("const sentinelValue = ({})(x.{discriminant})", render(&tag)));
    code.open("if(sentinelValue instanceof Error) {");
    code.line(&format!(
        "return new Error({} + sentinelValue.message)",
        js_str(&format!("Sentinel field {discriminant} could not deserialize properly: ")),
    ));
    code.close("}");
    code.open("else {");
    code.open("switch(sentinelValue) {");
    for variant in variants {
        code.open(&format!("case {}:", js_str(&variant.key)));
        code.line(&format!("return ({})(x)", render(&variant.de)));
        code.depth -= 1;
    }
    code.open("default:");
    code.line("return new Error('unreachable')");
    code.depth -= 1;
    code.close("}");
    code.close("}");
    code.close("}");
    code.open("else {");
    code.line(&format!(
        "return new Error({} + JSON.stringify(x))",
        js_str(&format!("Could not deserialize object into {ty}: ")),
    ));
    code.close("}");
    code.close("}");
    code.finish()
}

/// Single-quoted string literal.
pub fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn point() -> Generator {
        Generator::object("Point", vec![
            Field::new("x", Generator::number()),
            Field::new("y", Generator::number()),
        ])
    }

    /// Brace balance, ignoring braces inside string literals.
    fn balance(src: &str) -> i64 {
        let mut depth = 0i64;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for c in src.chars() {
            match quote {
                Some(q) => {
                    if escaped { escaped = false; }
                    else if c == '\\' { escaped = true; }
                    else if c == q { quote = None; }
                }
                None => match c {
                    '\'' | '"' => quote = Some(c),
                    '{' => depth += 1,
                    '}' => { depth -= 1; assert!(depth >= 0, "closed an unopened block"); }
                    _ => {}
                },
            }
        }
        depth
    }

    #[test]
    fn leaves_render_runtime_names() {
        assert_eq!(render(&Generator::bool()), "deBool");
        assert_eq!(render(&Generator::number()), "deNumber");
        assert_eq!(render(&Generator::string()), "deString");
        assert_eq!(render(&Generator::file_path()), "deString");
        assert_eq!(render(&Generator::list(Generator::string())), "deList.bind(null, deString)");
        assert_eq!(
            render(&Generator::mapping(Generator::string(), Generator::bool())),
            "deMapping.bind(null, deString, deBool)",
        );
    }

    #[test]
    fn object_renders_nested_field_chain() {
        let expected = r#"(json: mixed): Point | Error => {
  if(json === null) {
    return new Error('Could not deserialize json because the value is null.')
  }
  else if(typeof json == 'undefined') {
    return new Error('Could not deserialize json because the value is undefined.')
  }
  else if(json instanceof Error || typeof json != 'object') {
    return new Error('Could not deserialize object "' + String(json) + '"')
  }
  else {
    const x = deField('x', (deNumber), json.x)
    if(x instanceof Error) {
      const fieldError: Error = x
      return new Error('Could not deserialize field "x": ' + fieldError.message)
    }
    else {
      const y = deField('y', (deNumber), json.y)
      if(y instanceof Error) {
        const fieldError: Error = y
        return new Error('Could not deserialize field "y": ' + fieldError.message)
      }
      else {
        const result: Point = {
          x,
          y,
        }
        return result
      }
    }
  }
}"#;
        assert_eq!(render(&point()), expected);
    }

    #[test]
    fn nested_generators_keep_braces_balanced() {
        let nested = Generator::object_with_optional(
            "Outer",
            vec![
                Field::new("inner", point()),
                Field::new("points", Generator::list(point())),
                Field::new("color", Generator::enum_of("Color", ["red", "green"])),
            ],
            vec![Field::new("note", Generator::string())],
        );
        assert_eq!(balance(&render(&nested)), 0);
        assert_eq!(balance(&render(&Generator::object("Empty", vec![]))), 0);
    }

    #[test]
    fn optional_fields_skip_absent_values() {
        let text = render(&Generator::object_with_optional("T", vec![], vec![Field::new("note", Generator::string())]));
        assert!(text.contains(
            "const note = !Object.prototype.hasOwnProperty.call(json, 'note') || json.note == null \
             ? undefined : deField('note', (deString), json.note)"
        ));
    }

    #[test]
    fn optional_fields_ignore_inherited_properties() {
        let text = render(&Generator::object_with_optional("T", vec![], vec![Field::new("constructor", Generator::string())]));
        assert!(text.contains("!Object.prototype.hasOwnProperty.call(json, 'constructor') || json.constructor == null"));
    }

    #[test]
    fn field_named_error_keeps_its_own_binding() {
        let text = render(&Generator::object("Resp", vec![Field::new("error", Generator::string())]));
        assert!(text.contains("const error = deField('error', (deString), json.error)"));
        assert!(text.contains("const fieldError: Error = error\n"));
        assert!(text.contains("' + fieldError.message)"));
        assert!(!text.contains("const error: Error"));
    }

    #[test]
    fn empty_object_builds_empty_record() {
        let text = render(&Generator::object("Empty", vec![]));
        assert!(text.contains("const result: Empty = {}"));
    }

    #[test]
    fn enum_renders_strict_equality_chain() {
        let text = render(&Generator::enum_of("Color", ["red", "it's"]));
        assert!(text.contains("const either = deString(v)"));
        assert!(text.contains("if(either === 'red' || either === 'it\\'s') {"));
        assert!(text.contains("into one of the enum values: red, it\\'s'"));
        assert!(text.contains("'\" into enum \"Color\": ' + either.message"));
        assert!(render(&Generator::enum_of("Never", Vec::<String>::new())).contains("if(false) {"));
    }

    #[test]
    fn literal_value_inlines_json() {
        let text = render(&Generator::value("string", json!("circle")));
        assert!(text.contains("if(typeof x != 'string') {"));
        assert!(text.contains("else if(x === \"circle\") {"));
        assert!(text.contains("into a string with the value \"circle\".'"));
    }

    #[test]
    fn sum_renders_a_reference_and_a_switch_hoist() {
        let variants = vec![
            Sentinel::new("circle", Generator::object("Circle", vec![Field::new("r", Generator::number())])),
            Sentinel::new("square", Generator::object("Square", vec![Field::new("s", Generator::number())])),
        ];
        let shape = Generator::sum("Shape", "kind", "ShapeKind", variants.clone());
        assert_eq!(render(&shape), "ShapeRefine");

        let hoist = refine_hoist(&"Shape".into(), "kind", &"ShapeKind".into(), &variants);
        assert!(hoist.starts_with("const ShapeRefine = (x: mixed): Shape | Error => {"));
        assert!(hoist.contains("x.hasOwnProperty('kind') && typeof x.kind == 'string'"));
        assert!(hoist.contains("(v: mixed): ShapeKind | Error => {"));
        assert!(hoist.contains("case 'circle':"));
        assert!(hoist.contains("case 'square':"));
        assert!(hoist.contains("default:\n          return new Error('unreachable')"));
        assert_eq!(balance(&hoist), 0);
    }

    #[test]
    fn rendering_is_idempotent() {
        let g = Generator::sum("S", "tag", "STag", vec![Sentinel::new("p", point())]);
        assert_eq!(render(&g), render(&g));
        assert_eq!(g.deps(), g.deps());
    }

    #[test]
    fn js_str_escapes() {
        assert_eq!(js_str("plain"), "'plain'");
        assert_eq!(js_str("a'b\\c\nd"), "'a\\'b\\\\c\\nd'");
        assert_eq!(js_str("\u{1}"), "'\\u0001'");
    }
}
