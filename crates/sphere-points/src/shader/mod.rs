//! WGSL source for the point sphere pipeline and its compile-time variants.
//!
//! wgpu has no shader-def support of its own, so the source carries
//! `#ifdef NAME` / `#ifndef NAME` / `#else` / `#endif` blocks that are
//! resolved here before the module is created. Each variant becomes its
//! own shader module and pipeline; nothing branches on the variant at
//! draw time.

use std::fmt;
use thiserror::Error;

/// Raw, unpreprocessed shader source.
pub const POINT_SPHERE_WGSL: &str = include_str!("point_sphere.wgsl");

pub const VERTEX_ENTRY: &str = "vertex";
pub const FRAGMENT_ENTRY: &str = "fragment";

/// Which compiled configuration of the shader to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderVariant {
    /// Points are `xyzrgb`; otherwise `xyz` with a fallback colour.
    pub colored: bool,
    /// Two keyframe offset buffers are bound and interpolated.
    pub animated: bool,
    /// Discard fragments outside the unit disc.
    pub round_footprint: bool,
}

impl ShaderVariant {
    /// All eight variants, in a stable order.
    pub fn all() -> impl Iterator<Item = ShaderVariant> {
        (0u8..8).map(|bits| ShaderVariant {
            colored: bits & 0b001 != 0,
            animated: bits & 0b010 != 0,
            round_footprint: bits & 0b100 != 0,
        })
    }

    /// Names defined for the preprocessor.
    pub fn shader_defs(&self) -> Vec<&'static str> {
        let mut defs = Vec::new();
        if self.colored {
            defs.push("COLORED");
        }
        if self.animated {
            defs.push("ANIMATED");
        }
        if self.round_footprint {
            defs.push("ROUND_FOOTPRINT");
        }
        defs
    }

    /// Fully resolved WGSL for this variant.
    pub fn source(&self) -> Result<String, ShaderError> {
        preprocess(POINT_SPHERE_WGSL, &self.shader_defs())
    }
}

impl fmt::Display for ShaderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defs = self.shader_defs();
        if defs.is_empty() {
            f.write_str("plain")
        } else {
            f.write_str(&defs.join("+"))
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("line {line}: `{directive}` without a matching #ifdef")]
    Unbalanced { line: usize, directive: &'static str },
    #[error("line {line}: `#ifdef`/`#ifndef` needs a name")]
    MissingName { line: usize },
    #[error("{open} conditional block(s) left open at end of source")]
    Unterminated { open: usize },
    #[error("line {line}: unknown directive `{text}`")]
    UnknownDirective { line: usize, text: String },
}

struct Block {
    /// Whether the enclosing blocks are all active.
    parent_active: bool,
    /// Whether the current branch of this block is taken.
    taken: bool,
    seen_else: bool,
}

/// Resolves conditional blocks in `source` against `defs`. Lines of
/// inactive branches are dropped; all directive lines are removed.
pub fn preprocess(source: &str, defs: &[&str]) -> Result<String, ShaderError> {
    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<Block> = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let active = stack.last().map_or(true, |b| b.parent_active && b.taken);
        let trimmed = line.trim_start();

        if !trimmed.starts_with('#') {
            if active {
                out.push_str(line);
                out.push('\n');
            }
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let directive = parts.next().unwrap_or_default();
        match directive {
            "#ifdef" | "#ifndef" => {
                let name = parts.next().ok_or(ShaderError::MissingName { line: line_no })?;
                let defined = defs.contains(&name);
                stack.push(Block {
                    parent_active: active,
                    taken: if directive == "#ifdef" { defined } else { !defined },
                    seen_else: false,
                });
            }
            "#else" => {
                let block = stack.last_mut().ok_or(ShaderError::Unbalanced {
                    line: line_no,
                    directive: "#else",
                })?;
                if block.seen_else {
                    return Err(ShaderError::Unbalanced {
                        line: line_no,
                        directive: "#else",
                    });
                }
                block.taken = !block.taken;
                block.seen_else = true;
            }
            "#endif" => {
                stack.pop().ok_or(ShaderError::Unbalanced {
                    line: line_no,
                    directive: "#endif",
                })?;
            }
            _ => {
                return Err(ShaderError::UnknownDirective {
                    line: line_no,
                    text: trimmed.to_string(),
                })
            }
        }
    }

    if !stack.is_empty() {
        return Err(ShaderError::Unterminated { open: stack.len() });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_taken_branches() {
        let src = "a\n#ifdef X\nb\n#else\nc\n#endif\n#ifndef X\nd\n#endif\ne\n";
        assert_eq!(preprocess(src, &["X"]).unwrap(), "a\nb\ne\n");
        assert_eq!(preprocess(src, &[]).unwrap(), "a\nc\nd\ne\n");
    }

    #[test]
    fn nested_blocks_respect_parent() {
        let src = "#ifdef A\n#ifdef B\nab\n#else\na\n#endif\n#endif\n";
        assert_eq!(preprocess(src, &["B"]).unwrap(), "");
        assert_eq!(preprocess(src, &["A"]).unwrap(), "a\n");
        assert_eq!(preprocess(src, &["A", "B"]).unwrap(), "ab\n");
    }

    #[test]
    fn reports_unbalanced_directives() {
        assert_eq!(
            preprocess("#endif\n", &[]),
            Err(ShaderError::Unbalanced { line: 1, directive: "#endif" })
        );
        assert_eq!(
            preprocess("#ifdef A\n", &[]),
            Err(ShaderError::Unterminated { open: 1 })
        );
        assert_eq!(
            preprocess("#ifdef A\n#else\n#else\n#endif\n", &[]),
            Err(ShaderError::Unbalanced { line: 3, directive: "#else" })
        );
        assert!(matches!(
            preprocess("#define A\n", &[]),
            Err(ShaderError::UnknownDirective { line: 1, .. })
        ));
    }

    #[test]
    fn every_variant_resolves_cleanly() {
        for variant in ShaderVariant::all() {
            let src = variant.source().unwrap();
            assert!(!src.lines().any(|l| l.trim_start().starts_with('#')), "{variant}");
            assert!(src.contains("fn vertex("));
            assert!(src.contains("fn fragment("));
            assert_eq!(src.contains("prev_keyframe"), variant.animated, "{variant}");
            assert_eq!(src.contains("discard;"), variant.round_footprint, "{variant}");
            let stride = if variant.colored {
                "POINT_STRIDE: u32 = 6u"
            } else {
                "POINT_STRIDE: u32 = 3u"
            };
            assert!(src.contains(stride), "{variant}");
            assert_eq!(src.contains("fract(position)"), !variant.colored, "{variant}");
        }
    }

    #[test]
    fn variants_are_distinct() {
        let all: Vec<_> = ShaderVariant::all().collect();
        assert_eq!(all.len(), 8);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(ShaderVariant::default().to_string(), "plain");
    }
}
