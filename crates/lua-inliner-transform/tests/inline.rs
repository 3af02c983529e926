//! End-to-end tests: parse, inline, print.

use lua_inliner_diagnostics::{DiagnosticCode, Severity, SourceCache};
use lua_inliner_parser::{parse_lua, print_chunk, ScopeTree};
use lua_inliner_transform::{
    collect_inline_calls, collect_inline_functions, inline, inline_source, InlineOptions,
};
use std::collections::HashSet;

fn inline_ok(source: &str) -> String {
    match inline_source(source, &InlineOptions::default()) {
        Ok(output) => output,
        Err(diagnostics) => panic!(
            "inlining failed: {:?}",
            diagnostics.iter().map(|d| &d.message).collect::<Vec<_>>()
        ),
    }
}

const ADD: &str = "local function f(a, b)\n    --!!INLINE_FUNCTION\n    return a + b\nend\n";

#[test]
fn local_initializer_receives_the_return_value() {
    let output = inline_ok(&format!("{ADD}local x = f(1, 2)\n"));
    assert_eq!(
        output,
        format!(
            "{ADD}local __inline_return__0 = nil\n\
             repeat\n    local a, b = 1, 2\n    __inline_return__0 = a + b\n    break\nuntil true\n\
             local x = __inline_return__0\n"
        )
    );
}

#[test]
fn call_statement_is_replaced_by_the_expansion() {
    let output = inline_ok(&format!("{ADD}f(1, 2)\n"));
    // No return placeholders; the sum may call a metamethod, so it is kept.
    assert_eq!(
        output,
        format!(
            "{ADD}repeat\n    local a, b = 1, 2\n    local __inline_discard__0 = a + b\n    break\nuntil true\n"
        )
    );
    assert!(!output.contains("__inline_return__"));
    assert!(!output.ends_with("f(1, 2)\n"));
}

#[test]
fn zero_parameters_zero_returns_inserts_only_the_body() {
    let hello = "local function hello()\n    --!!INLINE_FUNCTION\n    print(\"hello\")\n    print(\"world\")\nend\n";
    let output = inline_ok(&format!("{hello}hello()\n"));
    assert_eq!(
        output,
        format!("{hello}repeat\n    print(\"hello\")\n    print(\"world\")\nuntil true\n")
    );
}

#[test]
fn last_argument_receives_every_return_value() {
    let two = "local function f(a, b)\n    --!!INLINE_FUNCTION\n    return a + b, a - b\nend\n";
    let output = inline_ok(&format!("{two}print(f(1, 2))\n"));
    assert!(output.ends_with(
        "local __inline_return__0, __inline_return__1 = nil, nil\n\
         repeat\n    local a, b = 1, 2\n    __inline_return__0, __inline_return__1 = a + b, a - b\n    break\nuntil true\n\
         print(__inline_return__0, __inline_return__1)\n"
    ));

    let output = inline_ok(&format!("{two}print(f(1, 2), 0)\n"));
    assert!(output.ends_with("print(__inline_return__0, 0)\n"));
}

#[test]
fn placeholders_are_hygienic_and_distinct() {
    let source = format!(
        "{ADD}local __inline_return__0, __inline_return__2 = 1, 2\n\
         do\n    local x = f(f(1, 2), __inline_return__0)\nend\n"
    );
    let chunk = parse_lua(&source).unwrap();
    let functions = collect_inline_functions(&chunk).functions;
    assert_eq!(functions[0].max_return_count, 1);

    let output = inline_ok(&source);
    let declared: Vec<&str> = output
        .lines()
        .filter(|line| line.ends_with(" = nil"))
        .filter_map(|line| line.trim().strip_prefix("local __inline_return__"))
        .filter_map(|rest| rest.split(' ').next())
        .collect();
    // One placeholder per call, none reusing a visible name.
    assert_eq!(declared, vec!["1", "3"]);
    let unique: HashSet<&str> = declared.iter().copied().collect();
    assert_eq!(unique.len(), declared.len());
    assert!(output.contains("local x = __inline_return__3\n"));
}

#[test]
fn output_without_directives_is_unchanged() {
    let plain = "local function g(a)\n    return a * 2\nend\nlocal y = g(3)\nprint(y)\n";
    assert_eq!(inline_ok(plain), plain);

    // Rewritten code with the declarations removed inlines nothing further.
    let rewritten = inline_ok(&format!("{ADD}local x = f(1, 2)\nprint(x)\n"));
    let body = rewritten.split_once("end\n").map(|(_, rest)| rest).unwrap();
    assert_eq!(inline_ok(body), body);

    let chunk = parse_lua(body).unwrap();
    assert!(collect_inline_functions(&chunk).functions.is_empty());
}

#[test]
fn recursive_calls_are_rejected_and_left_alone() {
    let source = "local function count(n)\n    --!!INLINE_FUNCTION\n    if n > 0 then\n        return count(n - 1)\n    end\n    return 0\nend\n";
    let diagnostics = inline_source(source, &InlineOptions::default()).unwrap_err();
    assert_eq!(diagnostics.count_of(DiagnosticCode::RecursiveCall), 1);

    let chunk = parse_lua(source).unwrap();
    let functions = collect_inline_functions(&chunk).functions;
    let scopes = ScopeTree::build(&chunk);
    let calls = collect_inline_calls(&chunk, &functions, &scopes);
    assert!(calls.calls.is_empty());
}

#[test]
fn variadic_functions_stay_ordinary_calls() {
    let source = "local function sum(...)\n    --!!INLINE_FUNCTION\n    return select(\"#\", ...)\nend\nlocal n = sum(1, 2)\n";
    let chunk = parse_lua(source).unwrap();
    let collected = collect_inline_functions(&chunk);
    assert!(collected.functions.is_empty());
    assert_eq!(collected.diagnostics.count_of(DiagnosticCode::VariadicFunction), 1);

    let options = InlineOptions::default()
        .with_override(DiagnosticCode::VariadicFunction, Severity::Hint)
        .with_override(DiagnosticCode::InvalidDirective, Severity::Hint);
    let output = inline_source(source, &options).unwrap();
    assert_eq!(output, print_chunk(&chunk));
    assert!(output.ends_with("local n = sum(1, 2)\n"));
}

#[test]
fn diagnostics_resolve_to_source_locations() {
    let source = "local x = 1\nlocal function f(n)\n    --!!INLINE_FUNCTION\n    return f(n)\nend\n";
    let mut cache = SourceCache::new();
    let diagnostics = inline(source, "rec.lua", &mut cache, &InlineOptions::default()).unwrap_err();
    let recursive = diagnostics.iter().next().unwrap();
    assert_eq!(recursive.code, DiagnosticCode::RecursiveCall);
    assert_eq!(
        cache.location(recursive.span).unwrap().to_string(),
        "rec.lua:4:12"
    );
    assert_eq!(
        cache.location(recursive.labels[0].span).unwrap().to_string(),
        "rec.lua:2:16"
    );
}

#[test]
fn comments_around_call_sites_survive() {
    let output = inline_ok(&format!(
        "{ADD}\n-- the sum\nlocal x = f(1, 2) -- three\n"
    ));
    assert!(output.ends_with(
        "end\n\n-- the sum\nlocal __inline_return__0 = nil\n\
         repeat\n    local a, b = 1, 2\n    __inline_return__0 = a + b\n    break\nuntil true\n\
         local x = __inline_return__0 -- three\n"
    ));
}

#[test]
fn realistic_module_is_inlined() {
    let source = "\
local function clamp(v, lo, hi)
    --!!INLINE_FUNCTION
    if v < lo then
        return lo
    elseif v > hi then
        return hi
    end
    return v
end

local function lerp(a, b, t)
    --!!INLINE_FUNCTION
    return a + (b - a) * clamp(t, 0, 1)
end

local M = {}

function M.mix(x, y, t)
    return lerp(x, y, t)
end

return M
";
    let output = inline_ok(source);
    let mix = output.split_once("function M.mix(x, y, t)\n").map(|(_, rest)| rest).unwrap();
    assert!(!mix.contains("lerp("));
    assert!(!mix.contains("clamp("));
    assert!(mix.contains("        local v, lo, hi = t, 0, 1\n"));
    assert!(mix.ends_with("    return __inline_return__1\nend\n\nreturn M\n"));
}

const FIND: &str = "local function find(t, v)
    --!!INLINE_FUNCTION
    for i = 1, #t do
        if t[i] == v then
            return i
        end
    end
    return nil
end
";

#[test]
fn return_inside_a_loop_skips_the_rest_of_the_body() {
    let output = inline_ok(&format!("{FIND}local k = find({{ 1, 2, 3 }}, 2)\n"));
    let expansion = output.strip_prefix(FIND).unwrap();
    assert_eq!(
        expansion,
        "local __inline_return__0 = nil\n\
         repeat\n    local t, v = { 1, 2, 3 }, 2\n    for i = 1, #t do\n        if t[i] == v then\n            __inline_return__0 = i\n            goto __inline_exit__1\n        end\n    end\n    __inline_return__0 = nil\n    break\nuntil true\n\
         ::__inline_exit__1::\n\
         local k = __inline_return__0\n"
    );
}

#[test]
fn shadowed_upvalue_keeps_the_call() {
    let source = "local n = 0
local function bump()
    --!!INLINE_FUNCTION
    n = n + 1
end
do
    local n = 10
    bump()
    print(n)
end
bump()
";
    let mut cache = SourceCache::new();
    let output = inline(source, "bump.lua", &mut cache, &InlineOptions::default()).unwrap();
    assert_eq!(output.stats.call_sites, 1);
    assert_eq!(output.diagnostics.count_of(DiagnosticCode::ShadowedCapture), 1);

    let shadowed = output.diagnostics.iter().next().unwrap();
    assert_eq!(shadowed.severity, Severity::Warning);
    assert_eq!(cache.location(shadowed.span).unwrap().to_string(), "bump.lua:8:5");

    let rendered = output.render();
    assert!(rendered.contains("    local n = 10\n    bump()\n    print(n)\nend\n"));
    assert!(rendered.ends_with("end\nrepeat\n    n = n + 1\nuntil true\n"));
}

#[test]
fn surplus_global_arguments_are_still_read() {
    let source = "local function first(a)
    --!!INLINE_FUNCTION
    return a
end
local y = 2
local x = first(1, y, strict_global)
local z = first(1, y)
";
    let output = inline_ok(source);
    assert!(output.contains("    local a = 1, y, strict_global\n"));
    assert!(output.contains("    local a = 1\n"));
}
