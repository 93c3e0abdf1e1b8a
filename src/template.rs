use anyhow::{bail, Result};
use regex::Regex;

use crate::config::{NetlistStyle, ParamSpec};

/// Compiled substitution points for one sweep configuration.
///
/// Built once, then applied to the template text for every combination.
/// A parameter with no substitution point in the template is a hard
/// error: silently sweeping a constant netlist is worse than aborting.
pub struct NetlistPatcher {
    subs: Vec<Substitution>,
}

struct Substitution {
    spec: ParamSpec,
    matcher: Matcher,
}

enum Matcher {
    /// Matches `.param NAME=<numeric token with optional unit suffix>`,
    /// so re-patching already-patched output is idempotent.
    Declaration(Regex),
    /// Literal `{NAME}` token.
    Token(String),
}

impl NetlistPatcher {
    pub fn new(style: NetlistStyle, params: &[ParamSpec]) -> Result<Self> {
        let subs = params
            .iter()
            .map(|spec| {
                let matcher = match style {
                    NetlistStyle::Param => Matcher::Declaration(Regex::new(&format!(
                        r"\.param\s+{}\s*=\s*[0-9][0-9.eE+\-]*[a-zA-Zµ]*",
                        regex::escape(&spec.name)
                    ))?),
                    NetlistStyle::Placeholder => Matcher::Token(format!("{{{}}}", spec.name)),
                };
                Ok(Substitution {
                    spec: spec.clone(),
                    matcher,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { subs })
    }

    /// Verifies that every declared parameter has a substitution point.
    pub fn check(&self, template: &str) -> Result<()> {
        for sub in &self.subs {
            match &sub.matcher {
                Matcher::Declaration(re) => {
                    if !re.is_match(template) {
                        bail!(
                            "template has no `.param {}=` declaration",
                            sub.spec.name
                        );
                    }
                }
                Matcher::Token(token) => {
                    if !template.contains(token.as_str()) {
                        bail!("template has no `{}` placeholder", token);
                    }
                }
            }
        }
        Ok(())
    }

    /// Substitutes one combination's values into the template text.
    /// `values` is index-aligned with the declared parameter order.
    pub fn render(&self, template: &str, values: &[f64]) -> Result<String> {
        assert_eq!(values.len(), self.subs.len());

        let mut text = template.to_string();
        for (sub, &value) in self.subs.iter().zip(values) {
            text = match &sub.matcher {
                Matcher::Declaration(re) => {
                    if !re.is_match(&text) {
                        bail!(
                            "template has no `.param {}=` declaration",
                            sub.spec.name
                        );
                    }
                    let decl = format!(
                        ".param {}={}",
                        sub.spec.name,
                        format_scaled(value, &sub.spec)
                    );
                    re.replace_all(&text, decl.as_str()).into_owned()
                }
                Matcher::Token(token) => {
                    if !text.contains(token.as_str()) {
                        bail!("template has no `{}` placeholder", token);
                    }
                    text.replace(token.as_str(), &format_plain(value))
                }
            };
        }
        Ok(text)
    }
}

/// Formats a value for a `.param` declaration, applying the parameter's
/// unit scale and suffix (`180e-9` becomes `180n` for lengths). The scaled
/// value is rounded at 1e-9 absolute to shed conversion noise, keeping
/// repeated patches byte-identical.
fn format_scaled(value: f64, spec: &ParamSpec) -> String {
    let scaled = value * spec.kind.scale();
    let rounded = (scaled * 1e9).round() / 1e9;
    format!("{}{}", rounded, spec.kind.suffix())
}

/// Plain base-unit value, no conversion. Used for placeholder templates.
fn format_plain(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParamKind, ValueSpec};

    fn param(name: &str, kind: ParamKind) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            kind,
            values: ValueSpec::List(vec![0.0]),
        }
    }

    const ASC_TEMPLATE: &str = "\
Version 4
SHEET 1 880 680
TEXT -48 304 Left 2 !.param W1=1u
TEXT -48 336 Left 2 !.param L1=180n
TEXT -48 368 Left 2 !.param IB=10u
TEXT -48 400 Left 2 !.param CC=1.5f
";

    #[test]
    fn test_declaration_patch_applies_unit_suffixes() {
        let params = vec![
            param("W1", ParamKind::Width),
            param("L1", ParamKind::Length),
            param("IB", ParamKind::Current),
            param("CC", ParamKind::Capacitance),
        ];
        let patcher = NetlistPatcher::new(NetlistStyle::Param, &params).unwrap();
        let rendered = patcher
            .render(ASC_TEMPLATE, &[2e-6, 360e-9, 20e-6, 2.99e-15])
            .unwrap();
        assert!(rendered.contains(".param W1=0.000002"));
        assert!(rendered.contains(".param L1=360n"));
        assert!(rendered.contains(".param IB=20u"));
        assert!(rendered.contains(".param CC=2.99f"));
    }

    #[test]
    fn test_declaration_patch_is_idempotent() {
        let params = vec![param("L1", ParamKind::Length)];
        let patcher = NetlistPatcher::new(NetlistStyle::Param, &params).unwrap();
        let once = patcher.render(ASC_TEMPLATE, &[500e-9]).unwrap();
        let twice = patcher.render(&once, &[500e-9]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.matches(".param L1=").count(), 1);
    }

    #[test]
    fn test_declaration_patch_handles_scientific_tokens() {
        let template = ".param W1=1.5e-06\n";
        let params = vec![param("W1", ParamKind::Width)];
        let patcher = NetlistPatcher::new(NetlistStyle::Param, &params).unwrap();
        let rendered = patcher.render(template, &[3e-6]).unwrap();
        assert_eq!(rendered, ".param W1=0.000003\n");
    }

    #[test]
    fn test_missing_declaration_is_fatal() {
        let params = vec![param("W9", ParamKind::Width)];
        let patcher = NetlistPatcher::new(NetlistStyle::Param, &params).unwrap();
        assert!(patcher.check(ASC_TEMPLATE).is_err());
        assert!(patcher.render(ASC_TEMPLATE, &[1e-6]).is_err());
    }

    #[test]
    fn test_placeholder_substitution_uses_plain_values() {
        let template = "M1 out in+ tail tail nmos W={W1} L={L1}\nI1 vdd bias {IB}\n";
        let params = vec![
            param("W1", ParamKind::Width),
            param("L1", ParamKind::Length),
            param("IB", ParamKind::Current),
        ];
        let patcher = NetlistPatcher::new(NetlistStyle::Placeholder, &params).unwrap();
        let rendered = patcher.render(template, &[2e-6, 1.8e-7, 0.00002]).unwrap();
        assert_eq!(
            rendered,
            "M1 out in+ tail tail nmos W=0.000002 L=0.00000018\nI1 vdd bias 0.00002\n"
        );
    }

    #[test]
    fn test_placeholder_replaces_every_occurrence() {
        let template = "M1 a b c d nmos W={W1}\nM2 e f g h nmos W={W1}\n";
        let params = vec![param("W1", ParamKind::Width)];
        let patcher = NetlistPatcher::new(NetlistStyle::Placeholder, &params).unwrap();
        let rendered = patcher.render(template, &[1e-6]).unwrap();
        assert!(!rendered.contains("{W1}"));
        assert_eq!(rendered.matches("0.000001").count(), 2);
    }

    #[test]
    fn test_missing_placeholder_is_fatal() {
        let params = vec![param("CC", ParamKind::Capacitance)];
        let patcher = NetlistPatcher::new(NetlistStyle::Placeholder, &params).unwrap();
        assert!(patcher.check("no tokens here").is_err());
    }

    #[test]
    fn test_check_accepts_complete_template() {
        let params = vec![
            param("W1", ParamKind::Width),
            param("L1", ParamKind::Length),
        ];
        let patcher = NetlistPatcher::new(NetlistStyle::Param, &params).unwrap();
        patcher.check(ASC_TEMPLATE).unwrap();
    }
}
