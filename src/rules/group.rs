//! Rule groups: the lexical scope rules are compiled in.
//!
//! A group collects the code block of a `\rules` section - variable
//! definitions, macro definitions, conditional macro deployments and rule
//! lines - and finalizes it against an option map:
//!
//! 1. **Code block execution**: statements run top to bottom; variables
//!    bind, deployments whose guard holds expand their macro's body in
//!    place (a re-parse in this scope, so macros may reference variables
//!    and other macros).
//! 2. **Rule expansion**: each rule line gets regular-variable
//!    substitution, anchor stripping, chain parsing and sub-rule
//!    enumeration.
//! 3. The owning processor installs the sub-rules into its trie.
//!
//! Finalization resets all state first, so only bindings made by the code
//! block itself survive; errors accumulate instead of aborting.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::error::FinalizeError;

use super::{Anchors, Destination, Rule, SheafChain};

/// Hard cap on variable substitution recursion.
const MAX_SUBSTITUTION_DEPTH: usize = 16;

/// Hard cap on nested macro deployments.
const MAX_DEPLOY_DEPTH: usize = 8;

/// Variables predeclared in every group scope: characters the mode syntax
/// reserves, plus invisibles that are awkward to type in an editor.
const PREDECLARED_VARS: &[(&str, &str)] = &[
    ("NULL", ""),
    ("NBSP", "{UNI_A0}"),
    ("WJ", "{UNI_2060}"),
    ("ZWSP", "{UNI_200B}"),
    ("ZWNJ", "{UNI_200C}"),
    ("UNDERSCORE", "{UNI_5F}"),
    ("ASTERISK", "{UNI_2A}"),
    ("COMMA", "{UNI_2C}"),
    ("LPAREN", "{UNI_28}"),
    ("RPAREN", "{UNI_29}"),
    ("LBRACKET", "{UNI_5B}"),
    ("RBRACKET", "{UNI_5D}"),
];

/// One raw line of a group's code block.
#[derive(Debug, Clone)]
pub struct CodeLine {
    /// Source line in the mode file.
    pub line: usize,
    /// The statement text.
    pub text: String,
}

/// A guard on a macro deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// True when the option is `"true"`.
    Flag(String),
    /// True when the option is not `"true"`.
    NotFlag(String),
    /// True when the option equals the given value.
    Equals(String, String),
}

impl Predicate {
    /// Parse `opt`, `!opt` or `opt == value`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some((name, value)) = text.split_once("==") {
            return Some(Self::Equals(
                name.trim().to_string(),
                value.trim().to_string(),
            ));
        }
        if let Some(name) = text.strip_prefix('!') {
            return Some(Self::NotFlag(name.trim().to_string()));
        }
        Some(Self::Flag(text.to_string()))
    }

    /// Evaluate against resolved options; `Err` carries an unknown name.
    pub fn eval(&self, options: &BTreeMap<String, String>) -> Result<bool, String> {
        let (name, check): (&str, Box<dyn Fn(&str) -> bool>) = match self {
            Self::Flag(name) => (name, Box::new(|v: &str| v == "true")),
            Self::NotFlag(name) => (name, Box::new(|v: &str| v != "true")),
            Self::Equals(name, value) => {
                let value = value.clone();
                (name, Box::new(move |v: &str| v == value))
            }
        };
        options
            .get(name)
            .map(|v| check(v))
            .ok_or_else(|| name.to_string())
    }
}

/// A deployment site of a macro.
#[derive(Debug, Clone)]
pub struct Deploy {
    /// Source line of the `\deploy`.
    pub line: usize,
    /// Macro name.
    pub name: String,
    /// Argument value expressions, variable references allowed.
    pub args: Vec<String>,
    /// Optional option guard.
    pub guard: Option<Predicate>,
}

/// One statement of a code block.
#[derive(Debug, Clone)]
pub enum Statement {
    /// A variable definition or rule line.
    Line(CodeLine),
    /// A macro deployment.
    Deploy(Deploy),
}

/// A parameterized rule template, expanded at deployment.
#[derive(Debug, Clone)]
pub struct Macro {
    /// Macro name.
    pub name: String,
    /// Parameter names.
    pub params: Vec<String>,
    /// Body statements, re-run in the deploying scope.
    pub body: Vec<Statement>,
}

/// A named finalization scope holding variables, macros and rules.
#[derive(Debug, Clone, Default)]
pub struct RuleGroup {
    /// Group name from the `\rules` header.
    pub name: String,
    statements: Vec<Statement>,
    macros: FxHashMap<String, Macro>,
    vars: FxHashMap<String, String>,
    /// Finalized rules, in authored order.
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    /// An empty group with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a code-block statement.
    pub fn push_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Append the contents of a `\vars { ... }` block: `NAME = expr;` items.
    pub fn push_var_block(&mut self, line: usize, body: &str) {
        for item in body.split(';') {
            let item = item.trim();
            if !item.is_empty() {
                self.statements.push(Statement::Line(CodeLine {
                    line,
                    text: item.to_string(),
                }));
            }
        }
    }

    /// Register a macro definition.
    pub fn add_macro(&mut self, macro_def: Macro) {
        self.macros.insert(macro_def.name.clone(), macro_def);
    }

    /// Current value of a variable, if bound.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Run the code block against resolved options and build rules.
    pub fn finalize(
        &mut self,
        options: &BTreeMap<String, String>,
        errors: &mut Vec<FinalizeError>,
    ) {
        self.vars.clear();
        self.rules.clear();
        for (name, value) in PREDECLARED_VARS {
            self.vars.insert((*name).to_string(), (*value).to_string());
        }
        let statements = self.statements.clone();
        self.run_statements(&statements, options, errors, 0);
    }

    fn run_statements(
        &mut self,
        statements: &[Statement],
        options: &BTreeMap<String, String>,
        errors: &mut Vec<FinalizeError>,
        depth: usize,
    ) {
        for statement in statements {
            match statement {
                Statement::Line(code_line) => self.finalize_code_line(code_line, errors),
                Statement::Deploy(deploy) => {
                    self.deploy_macro(deploy, options, errors, depth)
                }
            }
        }
    }

    fn finalize_code_line(&mut self, code_line: &CodeLine, errors: &mut Vec<FinalizeError>) {
        let text = code_line.text.trim();
        if text.is_empty() || text.starts_with("**") {
            return;
        }
        if let Some((src, schema)) = text.split_once("==>") {
            self.finalize_cross_rule(code_line.line, src, schema, errors);
        } else if let Some((src, dst)) = text.split_once("-->") {
            self.finalize_rule(code_line.line, src, dst, errors);
        } else if let Some((name, value)) = parse_var_decl(text) {
            self.vars.insert(name.to_string(), value.to_string());
        } else {
            errors.push(FinalizeError::UnknownStatement {
                line: code_line.line,
                text: text.to_string(),
            });
        }
    }

    fn finalize_rule(
        &mut self,
        line: usize,
        src_text: &str,
        dst_text: &str,
        errors: &mut Vec<FinalizeError>,
    ) {
        let Some(src) = self.apply_vars(line, src_text.trim(), true, errors) else {
            return;
        };
        let Some(dst) = self.apply_vars(line, dst_text.trim(), false, errors) else {
            return;
        };
        let (anchors, core) = Anchors::strip(&src);
        let mut rule = Rule::new(
            line,
            anchors,
            SheafChain::parse(core),
            Destination::Chain(SheafChain::parse(dst.trim())),
        );
        rule.finalize(errors);
        self.rules.push(rule);
    }

    fn finalize_cross_rule(
        &mut self,
        line: usize,
        src_text: &str,
        schema_text: &str,
        errors: &mut Vec<FinalizeError>,
    ) {
        let Some(src) = self.apply_vars(line, src_text.trim(), true, errors) else {
            return;
        };
        let schema_text = schema_text
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']');
        let mut schema = Vec::new();
        for part in schema_text.split_whitespace() {
            match part.parse::<usize>() {
                Ok(index) if index >= 1 => schema.push(index),
                _ => {
                    errors.push(FinalizeError::CrossSchemaInvalid {
                        line,
                        schema: schema_text.to_string(),
                    });
                    return;
                }
            }
        }
        if schema.is_empty() {
            errors.push(FinalizeError::CrossSchemaInvalid {
                line,
                schema: schema_text.to_string(),
            });
            return;
        }
        let (anchors, core) = Anchors::strip(&src);
        let mut rule = Rule::new(
            line,
            anchors,
            SheafChain::parse(core),
            Destination::Schema(schema),
        );
        rule.finalize(errors);
        self.rules.push(rule);
    }

    /// Substitute `{NAME}` references, bounded by the recursion cap.
    ///
    /// Unicode literals stay symbolic here - they resolve during fragment
    /// finalization - but are only legal where `allow_unicode` says so
    /// (rule sources and variable definitions).
    fn apply_vars(
        &self,
        line: usize,
        text: &str,
        allow_unicode: bool,
        errors: &mut Vec<FinalizeError>,
    ) -> Option<String> {
        let mut current = text.to_string();
        for _ in 0..MAX_SUBSTITUTION_DEPTH {
            let mut replaced = false;
            let mut out = String::with_capacity(current.len());
            let mut rest = current.as_str();
            while let Some(start) = rest.find('{') {
                out.push_str(&rest[..start]);
                let tail = &rest[start..];
                match parse_var_ref(tail) {
                    Some((name, consumed)) => {
                        if let Some(value) = self.vars.get(name) {
                            out.push_str(value);
                            replaced = true;
                        } else if is_unicode_literal(name) {
                            if allow_unicode {
                                out.push_str(&tail[..consumed]);
                            } else {
                                errors.push(FinalizeError::UnicodeVarMisuse {
                                    line,
                                    token: tail[..consumed].to_string(),
                                });
                                return None;
                            }
                        } else {
                            errors.push(FinalizeError::UnresolvedVariable {
                                line,
                                name: name.to_string(),
                            });
                            return None;
                        }
                        rest = &tail[consumed..];
                    }
                    None => {
                        out.push('{');
                        rest = &tail[1..];
                    }
                }
            }
            out.push_str(rest);
            current = out;
            if !replaced {
                return Some(current);
            }
        }
        errors.push(FinalizeError::SubstitutionOverflow {
            line,
            expression: text.to_string(),
        });
        None
    }

    fn deploy_macro(
        &mut self,
        deploy: &Deploy,
        options: &BTreeMap<String, String>,
        errors: &mut Vec<FinalizeError>,
        depth: usize,
    ) {
        if let Some(guard) = &deploy.guard {
            match guard.eval(options) {
                Ok(true) => {}
                Ok(false) => return,
                Err(name) => {
                    errors.push(FinalizeError::UnknownOption {
                        line: deploy.line,
                        name,
                    });
                    return;
                }
            }
        }
        if depth >= MAX_DEPLOY_DEPTH {
            errors.push(FinalizeError::DeployDepthExceeded {
                line: deploy.line,
                name: deploy.name.clone(),
            });
            return;
        }
        let Some(macro_def) = self.macros.get(&deploy.name).cloned() else {
            errors.push(FinalizeError::MacroUnknown {
                line: deploy.line,
                name: deploy.name.clone(),
            });
            return;
        };
        if macro_def.params.len() != deploy.args.len() {
            errors.push(FinalizeError::MacroArity {
                line: deploy.line,
                name: deploy.name.clone(),
                expected: macro_def.params.len(),
                got: deploy.args.len(),
            });
            return;
        }

        // Evaluate every argument before binding any, so arguments cannot
        // observe each other's bindings.
        let mut bindings: Vec<(String, String)> = Vec::new();
        for (param, arg) in macro_def.params.iter().zip(&deploy.args) {
            if self.vars.contains_key(param) {
                errors.push(FinalizeError::MacroShadow {
                    line: deploy.line,
                    name: param.clone(),
                });
                continue;
            }
            if let Some(value) = self.apply_vars(deploy.line, arg, true, errors) {
                bindings.push((param.clone(), value));
            }
        }
        for (name, value) in &bindings {
            self.vars.insert(name.clone(), value.clone());
        }

        self.run_statements(&macro_def.body, options, errors, depth + 1);

        for (name, _) in &bindings {
            self.vars.remove(name);
        }
    }
}

/// Parse `NAME = value` where NAME is `[0-9A-Z_]+`.
fn parse_var_decl(text: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = text.split_once('=')?;
    let name = lhs.trim();
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        Some((name, rhs.trim()))
    } else {
        None
    }
}

/// Parse a `{NAME}` reference at the start of `text`; returns the name and
/// the byte length consumed.
fn parse_var_ref(text: &str) -> Option<(&str, usize)> {
    let inner = text.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        Some((name, end + 2))
    } else {
        None
    }
}

/// True for `UNI_` followed by hex digits.
fn is_unicode_literal(name: &str) -> bool {
    name.strip_prefix("UNI_")
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(line: usize, text: &str) -> Statement {
        Statement::Line(CodeLine {
            line,
            text: text.to_string(),
        })
    }

    fn finalize(group: &mut RuleGroup) -> Vec<FinalizeError> {
        let mut errors = Vec::new();
        group.finalize(&BTreeMap::new(), &mut errors);
        errors
    }

    #[test]
    fn vars_substitute_into_rules() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(1, "V = (a,e)"));
        group.push_statement(line(2, "[{V}] --> [(A_TEHTA,E_TEHTA)]"));
        let errors = finalize(&mut group);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(group.rules[0].sub_rules.len(), 2);
        assert_eq!(group.rules[0].sub_rules[1].src, vec!["e"]);
    }

    #[test]
    fn nested_vars_resolve() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(1, "A = x"));
        group.push_statement(line(2, "B = {A}y"));
        group.push_statement(line(3, "{B} --> TINCO"));
        assert!(finalize(&mut group).is_empty());
        assert_eq!(group.rules[0].sub_rules[0].src, vec!["xy"]);
    }

    #[test]
    fn circular_vars_overflow() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(1, "A = {B}"));
        group.push_statement(line(2, "B = {A}"));
        group.push_statement(line(3, "{A} --> TINCO"));
        let errors = finalize(&mut group);
        assert!(matches!(
            errors.as_slice(),
            [FinalizeError::SubstitutionOverflow { line: 3, .. }]
        ));
    }

    #[test]
    fn unresolved_var_is_reported() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(4, "{MISSING} --> TINCO"));
        let errors = finalize(&mut group);
        assert!(matches!(
            errors.as_slice(),
            [FinalizeError::UnresolvedVariable { line: 4, .. }]
        ));
    }

    #[test]
    fn unicode_literal_stays_in_source_but_errors_in_destination() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(1, "{UNI_2C} --> PUNCT"));
        assert!(finalize(&mut group).is_empty());
        assert_eq!(group.rules[0].sub_rules[0].src, vec![","]);

        let mut group = RuleGroup::new("main");
        group.push_statement(line(2, "x --> {UNI_2C}"));
        let errors = finalize(&mut group);
        assert!(matches!(
            errors.as_slice(),
            [FinalizeError::UnicodeVarMisuse { line: 2, .. }]
        ));
    }

    #[test]
    fn predeclared_null_erases() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(1, "x{NULL} --> TINCO"));
        assert!(finalize(&mut group).is_empty());
        assert_eq!(group.rules[0].sub_rules[0].src, vec!["x"]);
    }

    #[test]
    fn finalize_resets_previous_state() {
        let mut group = RuleGroup::new("main");
        group.push_statement(line(1, "t --> TINCO"));
        finalize(&mut group);
        finalize(&mut group);
        assert_eq!(group.rules.len(), 1);
    }

    #[test]
    fn macro_deploys_with_bound_arguments() {
        let mut group = RuleGroup::new("main");
        group.add_macro(Macro {
            name: "pair".to_string(),
            params: vec!["S".to_string(), "D".to_string()],
            body: vec![line(10, "{S} --> {D}")],
        });
        group.push_statement(Statement::Deploy(Deploy {
            line: 20,
            name: "pair".to_string(),
            args: vec!["t".to_string(), "TINCO".to_string()],
            guard: None,
        }));
        assert!(finalize(&mut group).is_empty());
        assert_eq!(group.rules[0].sub_rules[0].src, vec!["t"]);
        // Macro locals are popped after deployment.
        assert!(group.var("S").is_none());
    }

    #[test]
    fn guarded_deploy_respects_options() {
        let mut group = RuleGroup::new("main");
        group.add_macro(Macro {
            name: "m".to_string(),
            params: vec![],
            body: vec![line(1, "t --> TINCO")],
        });
        group.push_statement(Statement::Deploy(Deploy {
            line: 2,
            name: "m".to_string(),
            args: vec![],
            guard: Some(Predicate::Flag("use_it".to_string())),
        }));

        let mut errors = Vec::new();
        let mut options = BTreeMap::new();
        options.insert("use_it".to_string(), "false".to_string());
        group.finalize(&options, &mut errors);
        assert!(group.rules.is_empty());

        options.insert("use_it".to_string(), "true".to_string());
        group.finalize(&options, &mut errors);
        assert_eq!(group.rules.len(), 1);
    }

    #[test]
    fn unknown_option_in_guard_is_reported() {
        let mut group = RuleGroup::new("main");
        group.add_macro(Macro {
            name: "m".to_string(),
            params: vec![],
            body: vec![],
        });
        group.push_statement(Statement::Deploy(Deploy {
            line: 3,
            name: "m".to_string(),
            args: vec![],
            guard: Some(Predicate::Flag("nope".to_string())),
        }));
        let errors = finalize(&mut group);
        assert!(matches!(
            errors.as_slice(),
            [FinalizeError::UnknownOption { line: 3, .. }]
        ));
    }

    #[test]
    fn recursive_deployment_is_capped() {
        let mut group = RuleGroup::new("main");
        group.add_macro(Macro {
            name: "loop".to_string(),
            params: vec![],
            body: vec![Statement::Deploy(Deploy {
                line: 1,
                name: "loop".to_string(),
                args: vec![],
                guard: None,
            })],
        });
        group.push_statement(Statement::Deploy(Deploy {
            line: 1,
            name: "loop".to_string(),
            args: vec![],
            guard: None,
        }));
        let errors = finalize(&mut group);
        assert!(errors
            .iter()
            .any(|e| matches!(e, FinalizeError::DeployDepthExceeded { .. })));
    }

    #[test]
    fn predicate_forms() {
        let mut options = BTreeMap::new();
        options.insert("style".to_string(), "classic".to_string());
        options.insert("on".to_string(), "true".to_string());
        assert_eq!(
            Predicate::parse("style == classic").unwrap().eval(&options),
            Ok(true)
        );
        assert_eq!(Predicate::parse("!on").unwrap().eval(&options), Ok(false));
        assert_eq!(Predicate::parse("on").unwrap().eval(&options), Ok(true));
    }
}
