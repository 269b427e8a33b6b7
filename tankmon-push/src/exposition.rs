//! Prometheus text exposition rewriting.
//!
//! Injects [`ExtraLabels`] into every metric line of a text exposition
//! payload. Comments are kept as-is and blank lines are dropped; line order
//! never changes.

use crate::error::StructuralViolation;
use crate::labels::ExtraLabels;

/// Rewrite `raw` so every metric line carries `labels`.
///
/// Injected labels always come first in the label block:
///
/// ```text
/// metric_name{foo="bar"} 1  ->  metric_name{sensor="tank1",foo="bar"} 1
/// metric_name 42            ->  metric_name{sensor="tank1"} 42
/// ```
///
/// With empty `labels` only whitespace trimming and blank-line removal apply.
pub fn rewrite(raw: &[u8], labels: &ExtraLabels) -> Result<Vec<u8>, StructuralViolation> {
    let extra = labels.as_str().as_bytes();
    let mut dst = Vec::with_capacity(raw.len() + raw.len() / 4);

    for line in raw.split(|&b| b == b'\n') {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(b"#") || extra.is_empty() {
            dst.extend_from_slice(line);
            dst.push(b'\n');
            continue;
        }

        if let Some(n) = line.iter().position(|&b| b == b'{') {
            let rest = &line[n + 1..];
            dst.extend_from_slice(&line[..=n]);
            dst.extend_from_slice(extra);
            if !rest.starts_with(b"}") {
                dst.push(b',');
            }
            dst.extend_from_slice(rest);
        } else {
            let Some(n) = line.iter().rposition(|&b| b == b' ') else {
                return Err(StructuralViolation {
                    line: String::from_utf8_lossy(line).into_owned(),
                });
            };
            dst.extend_from_slice(&line[..n]);
            dst.push(b'{');
            dst.extend_from_slice(extra);
            dst.push(b'}');
            dst.extend_from_slice(&line[n..]);
        }
        dst.push(b'\n');
    }

    Ok(dst)
}
