use std::collections::HashMap;

use boa_engine::{Context, Source};

use super::{InterpreterError, InterpreterResult, ScriptRuntime};

/// Host name reported through `location` inside executed scripts.
const PAGE_HOST: &str = "localhost";

/// Default runtime backed by the Boa JavaScript engine.
#[derive(Debug)]
pub struct BoaScriptRuntime;

impl BoaScriptRuntime {
    pub fn new() -> Self {
        Self
    }

    fn build_prelude(&self) -> String {
        format!(
            r#"
var window = globalThis;
var self = globalThis;
var location = {{
    href: "https://{host}/",
    hostname: "{host}",
    protocol: "https:"
}};
var navigator = {{ userAgent: "Mozilla/5.0", language: "en-US" }};
var document = {{
    currentScript: null,
    createElement: function(tag) {{ return {{ tagName: tag, style: {{}}, setAttribute: function() {{}} }}; }},
    getElementById: function() {{ return null; }},
    querySelector: function() {{ return null; }}
}};
function setTimeout(cb) {{ cb(); return 0; }}
function clearTimeout() {{}}
var __baseline = Object.keys(globalThis);
"#,
            host = PAGE_HOST
        )
    }

    fn capture_globals(&self, context: &mut Context) -> InterpreterResult<HashMap<String, String>> {
        let captured = context
            .eval(Source::from_bytes(CAPTURE_SCRIPT))
            .map_err(|err| InterpreterError::Execution(err.to_string()))?;

        let text = captured
            .to_string(context)
            .map_err(|err| InterpreterError::Execution(err.to_string()))?
            .to_std_string()
            .map_err(|_| InterpreterError::Other("unable to convert interpreter output".into()))?;

        serde_json::from_str(&text).map_err(|err| InterpreterError::Other(err.to_string()))
    }
}

impl Default for BoaScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

const CAPTURE_SCRIPT: &str = r#"
(function() {
    var out = {};
    Object.keys(globalThis).forEach(function(key) {
        if (key === "__baseline" || __baseline.indexOf(key) >= 0) return;
        var value = globalThis[key];
        if (value === undefined || value === null) return;
        if (typeof value === "function" || typeof value === "object") return;
        out[key] = String(value);
    });
    return JSON.stringify(out);
})()
"#;

impl ScriptRuntime for BoaScriptRuntime {
    fn run(&self, script: &str) -> InterpreterResult<HashMap<String, String>> {
        let mut context = Context::default();

        context
            .eval(Source::from_bytes(&self.build_prelude()))
            .map_err(|err| InterpreterError::Other(err.to_string()))?;

        context
            .eval(Source::from_bytes(script))
            .map_err(|err| InterpreterError::Execution(err.to_string()))?;

        self.capture_globals(&mut context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_marker_written_through_window() {
        let runtime = BoaScriptRuntime::new();
        let globals = runtime
            .run(r#"(function(w){ w["__probe_1"] = "1"; })(window);"#)
            .unwrap();
        assert_eq!(globals.get("__probe_1").map(String::as_str), Some("1"));
        assert!(!globals.contains_key("location"));
    }

    #[test]
    fn reports_script_errors() {
        let runtime = BoaScriptRuntime::new();
        let err = runtime.run("throw new Error('nope');").unwrap_err();
        assert!(matches!(err, InterpreterError::Execution(_)));
    }
}
