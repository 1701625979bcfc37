//! End-to-end conversion tests
//!
//! Each test converts a small in-memory package and checks the synthesized modules and
//! the diagnostics that come with them.

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::convert::{convert_package, ConversionOutput, OutputFile};
    use crate::error::{
        ConversionError, DIAG_CYCLIC_DEPENDENCY, DIAG_IMPORTED_BINDING_REASSIGNED,
        DIAG_PACKAGE_MAPPING_NOT_FOUND, DIAG_UNRESOLVED_REFERENCE,
    };
    use crate::settings::ConversionSettings;
    use crate::url::RelativeUrlHandler;

    fn package(files: &[(&str, &str)]) -> IndexMap<String, String> {
        files
            .iter()
            .map(|(url, text)| (url.to_string(), text.to_string()))
            .collect()
    }

    fn settings() -> ConversionSettings {
        ConversionSettings::new().with_namespace("NS")
    }

    fn convert_with(
        roots: &[&str],
        files: &[(&str, &str)],
        settings: &ConversionSettings,
    ) -> ConversionOutput {
        let roots: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        convert_package(&roots, &package(files), &RelativeUrlHandler::new(), settings)
            .expect("conversion failed")
    }

    fn convert(roots: &[&str], files: &[(&str, &str)]) -> ConversionOutput {
        convert_with(roots, files, &settings())
    }

    fn codes(output: &ConversionOutput) -> Vec<&str> {
        output.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // IDENTITY AND IDEMPOTENCE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_script_without_namespaces_is_unchanged() {
        let source = "function add(a, b) {\n  return a + b;\n}\n\nconsole.log(add(1, 2));\n";
        let output = convert(&["lib.js"], &[("lib.js", source)]);
        assert_eq!(output.source("lib.js"), Some(source));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_converting_output_again_is_a_no_op() {
        let first = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.util = function() { return 1; };</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>NS.util();</script>",
                ),
            ],
        );
        let a = first.source("a.js").unwrap().to_string();
        let b = first.source("b.js").unwrap().to_string();

        let second = convert(&["a.js", "b.js"], &[("a.js", &a), ("b.js", &b)]);
        assert_eq!(second.source("a.js"), Some(a.as_str()));
        assert_eq!(second.source("b.js"), Some(b.as_str()));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // EXPORTS AND IMPORTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_members_become_exports_and_local_references() {
        let output = convert(&["a.js"], &[("a.js", "NS.foo = 10;\nNS.bar = NS.foo + 1;\n")]);
        assert_eq!(
            output.source("a.js"),
            Some("export const foo = 10;\nexport const bar = foo + 1;\n")
        );
    }

    #[test]
    fn test_cross_document_reference_becomes_named_import() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.util = function() { return 1; };</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>NS.util();</script>",
                ),
            ],
        );
        let keys: Vec<&String> = output.files.keys().collect();
        assert_eq!(keys, vec!["a.js", "b.js"]);
        assert_eq!(output.source("a.js"), Some("export function util() { return 1; }\n"));
        assert_eq!(
            output.source("b.js"),
            Some("import { util } from './a.js';\n\nutil();\n")
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_import_alias_avoids_local_names() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.foo = 1;</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>var foo = 2;\nconsole.log(NS.foo, foo);</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("b.js"),
            Some("import { foo as foo$1 } from './a.js';\n\nvar foo = 2;\nconsole.log(foo$1, foo);\n")
        );
    }

    #[test]
    fn test_member_assigned_twice_is_mutable() {
        let source = "NS.count = 0;\nNS.increment = function() {\n  NS.count++;\n};\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        assert_eq!(
            output.source("a.js"),
            Some("export let count = 0;\nexport function increment() {\n  count++;\n}\n")
        );
    }

    #[test]
    fn test_alias_of_known_member_is_reexported() {
        let output = convert(&["a.js"], &[("a.js", "NS.b = 1;\nNS.a = NS.b;\n")]);
        assert_eq!(
            output.source("a.js"),
            Some("export const b = 1;\nexport { b as a };\n")
        );
    }

    #[test]
    fn test_member_written_only_in_functions_is_declared() {
        let source = "NS.init = function() {\n  NS.ready = true;\n};\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        assert_eq!(
            output.source("a.js"),
            Some("export let ready;\n\nexport function init() {\n  ready = true;\n}\n")
        );
    }

    #[test]
    fn test_namespace_object_members_are_expanded() {
        let source = "NS.Util = {\n  greet: function() {\n    return this.name;\n  },\n  name: 'x'\n};\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        assert_eq!(
            output.source("a.js"),
            Some("export function greet() {\n  return name;\n}\nexport const name = 'x';\n")
        );
    }

    #[test]
    fn test_expanded_members_keep_the_statement_column() {
        let source = "  NS.Util = {\n    n: 1,\n    go: function() {\n      return 2;\n    }\n  };\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        assert_eq!(
            output.source("a.js"),
            Some("  export const n = 1;\n  export function go() {\n    return 2;\n  }\n")
        );
    }

    #[test]
    fn test_captured_namespace_becomes_namespace_import() {
        let output = convert(
            &["b.html"],
            &[
                (
                    "a.html",
                    "<script>NS.Util = {\n  greet: function() { return 1; }\n};</script>",
                ),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>const U = NS.Util;\nU.greet();</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("b.js"),
            Some("import * as U from './a.js';\n\nU.greet();\n")
        );
    }

    #[test]
    fn test_assignment_to_excluded_reference_is_exported() {
        let settings = settings().with_reference_exclude("NS.legacy");
        let output = convert_with(&["a.js"], &[("a.js", "NS.legacy = makeLegacy();\n")], &settings);
        assert_eq!(
            output.source("a.js"),
            Some("const NS_legacy = makeLegacy();\n\nexport { NS_legacy as legacy };\n")
        );
    }

    #[test]
    fn test_conflicting_declarations_are_fatal() {
        let roots = vec!["b.html".to_string()];
        let files = package(&[
            ("a.html", "<script>NS.x = 1;</script>"),
            ("b.html", "<link rel=\"import\" href=\"a.html\">\n<script>NS.x = 2;</script>"),
        ]);
        let result = convert_package(&roots, &files, &RelativeUrlHandler::new(), &settings());
        assert!(matches!(
            result,
            Err(ConversionError::ConflictingExport { ref path, .. }) if path == "NS.x"
        ));
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let roots = vec!["a.html".to_string()];
        let files = package(&[("a.html", "<link rel=\"import\" href=\"gone.html\">")]);
        let result = convert_package(&roots, &files, &RelativeUrlHandler::new(), &settings());
        assert!(matches!(result, Err(ConversionError::UnresolvedInclude { .. })));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DEGRADED REWRITES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_cycle_is_reported_once_and_not_substituted() {
        let output = convert(
            &["a.html"],
            &[
                (
                    "a.html",
                    "<link rel=\"import\" href=\"b.html\">\n<script>NS.a = 1;</script>",
                ),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>NS.b = NS.a + 1;</script>",
                ),
            ],
        );
        let cycles = codes(&output)
            .into_iter()
            .filter(|c| *c == DIAG_CYCLIC_DEPENDENCY)
            .count();
        assert_eq!(cycles, 1);
        assert_eq!(
            output.source("b.js"),
            Some("import './a.js';\n\nexport const b = NS.a + 1;\n")
        );
        assert_eq!(
            output.source("a.js"),
            Some("import './b.js';\n\nexport const a = 1;\n")
        );
    }

    #[test]
    fn test_reassigning_imported_binding_is_reported() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.count = 0;</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>function reset() { NS.count = 5; }</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("b.js"),
            Some("import './a.js';\n\nfunction reset() { NS.count = 5; }\n")
        );
        assert_eq!(codes(&output), vec![DIAG_IMPORTED_BINDING_REASSIGNED]);
        assert_eq!(output.diagnostics[0].document, "b.html");
    }

    #[test]
    fn test_unknown_member_is_left_with_diagnostic() {
        let output = convert(&["a.js"], &[("a.js", "NS.missing();\nNS.missing();\n")]);
        assert_eq!(output.source("a.js"), Some("NS.missing();\nNS.missing();\n"));
        assert_eq!(codes(&output), vec![DIAG_UNRESOLVED_REFERENCE]);
    }

    #[test]
    fn test_excluded_reference_becomes_undefined() {
        let settings = settings().with_reference_exclude("NS.legacy");
        let output = convert_with(
            &["a.js"],
            &[("a.js", "if (NS.legacy) {\n  go();\n}\n")],
            &settings,
        );
        assert_eq!(output.source("a.js"), Some("if (undefined) {\n  go();\n}\n"));
    }

    #[test]
    fn test_unmapped_external_package_uses_relative_path() {
        let output = convert(
            &["a.html"],
            &[(
                "a.html",
                "<link rel=\"import\" href=\"bower_components/foo/foo.html\">",
            )],
        );
        assert_eq!(
            output.source("a.js"),
            Some("import './bower_components/foo/foo.js';\n")
        );
        assert_eq!(codes(&output), vec![DIAG_PACKAGE_MAPPING_NOT_FOUND]);
    }

    #[test]
    fn test_mapped_external_package_uses_package_name() {
        let roots = vec!["a.html".to_string()];
        let files = package(&[(
            "a.html",
            "<link rel=\"import\" href=\"bower_components/polymer/polymer.html\">",
        )]);
        let handler = RelativeUrlHandler::new().with_package("polymer", "@polymer/polymer");
        let output = convert_package(&roots, &files, &handler, &settings()).unwrap();
        assert_eq!(
            output.source("a.js"),
            Some("import '@polymer/polymer/polymer.js';\n")
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_excluded_document_is_neither_loaded_nor_imported() {
        let settings = settings().with_exclude("legacy.html");
        let output = convert_with(
            &["a.html"],
            &[(
                "a.html",
                "<link rel=\"import\" href=\"legacy.html\">\n<script>go();</script>",
            )],
            &settings,
        );
        assert_eq!(output.source("a.js"), Some("go();\n"));
        assert!(!output.files.contains_key("legacy.js"));
    }

    #[test]
    fn test_configured_maintained_document_keeps_markup() {
        let html = "<div>\n<script>NS.x = 1;</script>\n</div>";
        let settings = settings().with_maintained("a.html");
        let output = convert_with(&["a.html"], &[("a.html", html)], &settings);
        assert_eq!(output.source("a.html"), Some(html));
        assert!(!output.files.contains_key("a.js"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCRIPTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_wrapper_function_is_unwrapped() {
        let source = "(function() {\n  'use strict';\n  NS.a = 1;\n})();\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        assert_eq!(output.source("a.js"), Some("export const a = 1;\n"));
    }

    #[test]
    fn test_wrapper_around_plain_code_is_removed() {
        let output = convert(&["a.js"], &[("a.js", "(function() {\n  console.log('x');\n})();\n")]);
        assert_eq!(output.source("a.js"), Some("console.log('x');\n"));
    }

    #[test]
    fn test_top_level_this_is_global_object() {
        let output = convert(&["a.js"], &[("a.js", "console.log(this.location);\n")]);
        assert_eq!(output.source("a.js"), Some("console.log(window.location);\n"));
    }

    #[test]
    fn test_single_use_script_is_absorbed() {
        let output = convert(
            &["a.html"],
            &[
                (
                    "a.html",
                    "<script src=\"helper.js\"></script>\n<script>NS.a = helper();</script>",
                ),
                ("helper.js", "function helper() { return 1; }\n"),
            ],
        );
        assert_eq!(
            output.source("a.js"),
            Some("function helper() { return 1; }\n\nexport const a = helper();\n")
        );
        assert_eq!(output.files.get("helper.js"), Some(&OutputFile::Delete));
    }

    #[test]
    fn test_unparseable_script_is_kept() {
        let output = convert(&["a.html"], &[("a.html", "<script>let = ;</script>")]);
        assert_eq!(output.source("a.js"), Some("let = ;\n"));
        assert_eq!(codes(&output), vec![crate::error::DIAG_SCRIPT_PARSE_FAILED]);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // MARKUP
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_template_moves_into_element_class() {
        let html = r#"<dom-module id="x-a">
  <template><p>hi</p></template>
</dom-module>
<script>
  class XA extends HTMLElement {
    static get is() { return 'x-a'; }
  }
  customElements.define(XA.is, XA);
</script>"#;
        let output = convert(&["a.html"], &[("a.html", html)]);
        let text = output.source("a.js").unwrap();
        assert!(
            text.contains("template.innerHTML = `<p>hi</p>`;\n    return template;"),
            "{}",
            text
        );
        assert!(!text.contains("$_documentContainer"), "{}", text);
    }

    #[test]
    fn test_template_uses_html_tag_when_configured() {
        let html = r#"<link rel="import" href="lib/html-tag.html">
<dom-module id="x-a"><template><b>`</b></template></dom-module>
<script>Polymer({ is: 'x-a' });</script>"#;
        let settings = settings().with_html_tag("lib/html-tag.html", "html");
        let output = convert_with(
            &["a.html"],
            &[("a.html", html), ("lib/html-tag.html", "<script>window.x = 1;</script>")],
            &settings,
        );
        assert_eq!(
            output.source("a.js"),
            Some("import { html } from './lib/html-tag.js';\n\nPolymer({\n  _template: html`<b>\\`</b>`, is: 'x-a' });\n")
        );
    }

    #[test]
    fn test_unowned_markup_is_loaded_into_document() {
        let html = "<style>.x { color: red; }</style>\n<script>go();</script>";
        let output = convert(&["a.html"], &[("a.html", html)]);
        assert_eq!(
            output.source("a.js"),
            Some(
                "const $_documentContainer = document.createElement('template');\n\
                 $_documentContainer.innerHTML = `<style>.x { color: red; }</style>`;\n\
                 document.head.appendChild($_documentContainer.content);\n\n\
                 go();\n"
            )
        );
    }

    #[test]
    fn test_maintained_page_is_edited_in_place() {
        let index = "<html><head>\n\
                     <link rel=\"import\" href=\"src/app.html\">\n\
                     <script>window.x = 1;</script>\n\
                     <script type=\"module\">NS.start();</script>\n\
                     </head></html>";
        let output = convert(
            &["index.html"],
            &[
                ("index.html", index),
                ("src/app.html", "<script>NS.start = function() {};</script>"),
            ],
        );
        assert_eq!(output.source("src/app.js"), Some("export function start() {}\n"));
        assert_eq!(
            output.source("index.html"),
            Some(
                "<html><head>\n\
                 <script type=\"module\">import './src/app.js';</script>\n\
                 <script>window.x = 1;</script>\n\
                 <script type=\"module\">import { start } from './src/app.js';\nstart();</script>\n\
                 </head></html>"
            )
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCOPES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_local_binding_shadows_namespace_root() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.foo = 1;</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>function f(NS) { return NS.foo; }\nfunction g() { var NS = {}; return NS.foo; }</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("b.js"),
            Some("import './a.js';\n\nfunction f(NS) { return NS.foo; }\nfunction g() { var NS = {}; return NS.foo; }\n")
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_this_in_nested_function_is_kept_but_arrow_is_rewritten() {
        let source = "NS.Util = {\n  name: 'x',\n  run: function() {\n    var plain = function() { return this.name; };\n    var arrow = () => this.name;\n    return [plain, arrow];\n  }\n};\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        let text = output.source("a.js").unwrap();
        assert!(text.contains("var plain = function() { return this.name; };"), "{}", text);
        assert!(text.contains("var arrow = () => name;"), "{}", text);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_this_member_in_method_is_reported() {
        let source = "NS.Util = { go: function() { return this.missing; } };\n";
        let output = convert(&["a.js"], &[("a.js", source)]);
        assert_eq!(
            output.source("a.js"),
            Some("export function go() { return this.missing; }\n")
        );
        assert_eq!(codes(&output), vec![DIAG_UNRESOLVED_REFERENCE]);
    }

    #[test]
    fn test_global_object_prefix_is_stripped() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.util = function() { return 1; };</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>window.NS.util();</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("b.js"),
            Some("import { util } from './a.js';\n\nutil();\n")
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // COLLISIONS AND WHOLE NAMESPACES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_colliding_imports_use_one_suffixed_alias() {
        let output = convert(
            &["c.html"],
            &[
                ("a.html", "<script>NS.foo = 1;</script>"),
                ("b.html", "<script>NS.other = { foo: 2 };</script>"),
                (
                    "c.html",
                    "<link rel=\"import\" href=\"a.html\">\n<link rel=\"import\" href=\"b.html\">\n<script>console.log(NS.foo, NS.other.foo, NS.other.foo, NS.foo);</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("c.js"),
            Some(
                "import { foo } from './a.js';\n\
                 import { foo as foo$1 } from './b.js';\n\n\
                 console.log(foo, foo$1, foo$1, foo);\n"
            )
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_captured_namespace_with_suffixed_members_uses_named_imports() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.other = { x: 1 };\nNS.util = { x: 2 };</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>const U = NS.util;\nconsole.log(U.x);</script>",
                ),
            ],
        );
        assert_eq!(
            output.source("a.js"),
            Some("export const x = 1;\nexport const x$1 = 2;\n")
        );
        assert_eq!(
            output.source("b.js"),
            Some("import { x$1 } from './a.js';\n\nconsole.log(x$1);\n")
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_whole_namespace_read_with_suffixed_members_is_reported() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.other = { x: 1 };\nNS.util = { x: 2 };</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>use(NS.util);</script>",
                ),
            ],
        );
        assert_eq!(output.source("b.js"), Some("import './a.js';\n\nuse(NS.util);\n"));
        assert_eq!(codes(&output), vec![DIAG_UNRESOLVED_REFERENCE]);
    }

    #[test]
    fn test_self_initialised_namespace_is_imported_whole() {
        let output = convert(
            &["b.html"],
            &[
                ("a.html", "<script>NS.sub = NS.sub || {};\nNS.sub.a = 1;</script>"),
                (
                    "b.html",
                    "<link rel=\"import\" href=\"a.html\">\n<script>use(NS.sub);</script>",
                ),
            ],
        );
        assert_eq!(output.source("a.js"), Some("export const a = 1;\n"));
        assert_eq!(
            output.source("b.js"),
            Some("import * as sub from './a.js';\n\nuse(sub);\n")
        );
        assert!(output.diagnostics.is_empty());
    }
}
