/// Loader embedded at the top of every bundle.
///
/// A function expression applied to the module table and the entry id:
/// `(LOADER)(modules, entry);`. The cache entry of a module is created
/// before its body runs, so a circular `require` gets the exports object as
/// it is so far instead of re-entering the module.
pub const RUNTIME_JS: &str = r#"(function (modules, entry) {
  "use strict";

  var has = Object.prototype.hasOwnProperty;
  var cache = {};

  function notFound(id, from) {
    var err = new Error(
      "Cannot find module '" + id + "'" + (from ? " from '" + from + "'" : "")
    );
    err.code = "MODULE_NOT_FOUND";
    return err;
  }

  function load(id) {
    if (has.call(cache, id)) {
      // "loading" or "loaded": same exports object either way.
      return cache[id].exports;
    }
    if (!has.call(modules, id)) {
      throw notFound(id);
    }

    var mod = modules[id];
    var record = { state: "loading", exports: {} };
    cache[id] = record;

    function localRequire(name) {
      if (!has.call(mod.dependencies, name)) {
        throw notFound(name, id);
      }
      return load(mod.dependencies[name]);
    }

    try {
      new Function("require", "exports", mod.code)(localRequire, record.exports);
    } catch (err) {
      delete cache[id];
      throw err;
    }

    record.state = "loaded";
    return record.exports;
  }

  load(entry);
})"#;

/// Wraps a serialized module table and entry id into a runnable bundle.
pub fn bootstrap(table_json: &str, entry_json: &str) -> String {
    let mut out = String::with_capacity(RUNTIME_JS.len() + table_json.len() + entry_json.len() + 8);
    out.push_str(RUNTIME_JS);
    out.push('(');
    out.push_str(table_json);
    out.push_str(", ");
    out.push_str(entry_json);
    out.push_str(");\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_shape() {
        assert!(RUNTIME_JS.starts_with("(function (modules, entry)"));
        assert!(RUNTIME_JS.contains("state: \"loading\""));
        assert!(RUNTIME_JS.contains("record.state = \"loaded\""));
        assert!(RUNTIME_JS.contains("MODULE_NOT_FOUND"));
        // Exactly one bootstrap call.
        assert_eq!(RUNTIME_JS.matches("load(entry)").count(), 1);
    }

    #[test]
    fn test_bootstrap_applies_loader() {
        let bundle = bootstrap("{}", "\"./a.js\"");
        assert!(bundle.starts_with(RUNTIME_JS));
        assert!(bundle.ends_with("({}, \"./a.js\");\n"));
    }
}
