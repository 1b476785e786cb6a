// SPDX-License-Identifier: Apache-2.0

//! Compression variant identifier parsing.
//!
//! A variant spec is a compact `-`-delimited string such as `ZSTD-P2-L19`:
//! the first token names the compression method, every following token is a
//! single-letter flag followed by its value. The parser is pure and
//! deterministic; unknown flag letters are skipped so new flags can be
//! introduced without breaking older result sets.
//!
//! | flag | creation option |
//! |------|-----------------|
//! | `P`  | `PREDICTOR=<v>` |
//! | `L`  | `LEVEL=<v>` (or `JXL_EFFORT=<v>` when the method is `JXL`) |
//! | `Q`  | `QUALITY=<v>` |

use crate::engine::TranslateOption;

/// Parse a variant spec into ordered engine creation options.
///
/// `COMPRESS=<method>` always comes first; flag options follow in the order
/// they appear in the spec string.
pub fn parse_spec(spec: &str) -> Vec<TranslateOption> {
    let mut tokens = spec.split('-');
    let method = tokens.next().unwrap_or_default();

    let mut options = vec![TranslateOption::creation("COMPRESS", method)];
    for token in tokens {
        let Some(flag) = token.chars().next() else {
            continue;
        };
        let value = &token[flag.len_utf8()..];
        match flag {
            'P' => options.push(TranslateOption::creation("PREDICTOR", value)),
            'L' => {
                let key = if method == "JXL" { "JXL_EFFORT" } else { "LEVEL" };
                options.push(TranslateOption::creation(key, value));
            }
            'Q' => options.push(TranslateOption::creation("QUALITY", value)),
            _ => {}
        }
    }
    options
}

/// The method token of a spec string (`ZSTD-P2-L19` -> `ZSTD`).
pub fn method_of(spec: &str) -> &str {
    spec.split('-').next().unwrap_or_default()
}
