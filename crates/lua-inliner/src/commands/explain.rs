//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use lua_inliner_diagnostics::DiagnosticCode;

use super::use_color_on;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code or name to explain (e.g., INL003, recursive-call)
    pub code: String,
}

struct Explanation {
    code: DiagnosticCode,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const EXPLANATIONS: &[Explanation] = &[
    Explanation {
        code: DiagnosticCode::ParseError,
        title: "Parse Error",
        description: "The Lua source could not be lexed or parsed. Nothing is rewritten for a file that does not parse, whatever severity is configured.",
        example: Some("local = 1  -- missing name"),
        suggestion: Some("Fix the syntax error; the file must load with a regular Lua interpreter."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::InvalidDirective,
        title: "Invalid Inline Directive",
        description: r#"A --!!INLINE_FUNCTION comment appears somewhere it has no effect.

The directive is only recognised as the first comment inside the body of a
`local function` declaration, on its own line after the header."#,
        example: Some(r#"local function add(a, b) --!!INLINE_FUNCTION
    return a + b
end"#),
        suggestion: Some(r#"Move the directive to the first line of the body:

local function add(a, b)
    --!!INLINE_FUNCTION
    return a + b
end"#),
        related: &["INL002"],
    },
    Explanation {
        code: DiagnosticCode::VariadicFunction,
        title: "Variadic Inline Function",
        description: "Functions declaring `...` cannot be inlined: the expansion binds arguments to named locals and has nowhere to put the remaining values.",
        example: Some(r##"local function sum(...)
    --!!INLINE_FUNCTION
    return select("#", ...)
end"##),
        suggestion: Some("Give the function a fixed parameter list, or remove the directive."),
        related: &["INL001"],
    },
    Explanation {
        code: DiagnosticCode::RecursiveCall,
        title: "Recursive Inline Call",
        description: "An inline function calls itself. Expanding the call would never terminate, so the call cannot be inlined.",
        example: Some(r#"local function count(n)
    --!!INLINE_FUNCTION
    if n > 0 then
        return count(n - 1)
    end
    return 0
end"#),
        suggestion: Some("Remove the directive, or rewrite the recursion as a loop."),
        related: &["INL005"],
    },
    Explanation {
        code: DiagnosticCode::ConditionalCall,
        title: "Conditional Call Not Inlined",
        description: r#"The call is evaluated conditionally or more than once: the right operand of
`and`/`or`, a `while` or `repeat` condition, or an `elseif` condition.

Inlining hoists the body in front of the enclosing statement, which would run
it unconditionally and only once. The call is left as an ordinary call."#,
        example: Some("local ok = ready and check(x)"),
        suggestion: Some(r#"Evaluate the call in its own statement first:

local ok = ready
if ok then
    ok = check(x)
end"#),
        related: &["INL005"],
    },
    Explanation {
        code: DiagnosticCode::UnusedInlineFunction,
        title: "Unused Inline Function",
        description: "A function is marked for inlining but none of its calls were inlined.",
        example: None,
        suggestion: Some("Call it from a position that can be inlined, or drop the directive."),
        related: &["INL003", "INL004", "INL006"],
    },
    Explanation {
        code: DiagnosticCode::ShadowedCapture,
        title: "Captured Variable Shadowed At Call",
        description: r#"The inline function reads a variable from outside its body, and at this call
the same name refers to a different local.

The expansion is placed at the call, so the body would read or write the
shadowing local instead. The call is left as an ordinary call."#,
        example: Some(r#"local n = 0
local function bump()
    --!!INLINE_FUNCTION
    n = n + 1
end
do
    local n = 10
    bump()
end"#),
        suggestion: Some("Rename the local that shadows the captured variable."),
        related: &["INL004", "INL005"],
    },
];

fn find(code: &str) -> Option<&'static Explanation> {
    let code = DiagnosticCode::lookup(code)?;
    EXPLANATIONS.iter().find(|e| e.code == code)
}

pub fn run(args: ExplainArgs, format: OutputFormat, color: bool) -> Result<()> {
    let use_color = use_color_on(color, atty::Stream::Stdout);
    let explanation =
        find(&args.code).ok_or_else(|| anyhow!("Unknown diagnostic code: {}", args.code))?;
    let code = explanation.code.as_str();

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            } else {
                println!(
                    "\n{}: {}\n{}",
                    code,
                    explanation.title,
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            }

            println!(
                "\nDefault severity: {}",
                explanation.code.default_severity()
            );
            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": code,
                "name": explanation.code.name(),
                "title": explanation.title,
                "severity": explanation.code.default_severity().as_str(),
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
