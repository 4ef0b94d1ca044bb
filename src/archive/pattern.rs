//! Glob matching for entry paths
//!
//! `*` matches any run of characters and `?` any single one. Unless the
//! caller opts in, neither crosses a `/`, so `*.ogg` only matches files in
//! the package root. Matching ignores ASCII case, the same way entry
//! lookup does.

/// Match `text` against `pattern`. With `match_path_components` set, the
/// wildcards are allowed to cross path separators.
pub(crate) fn matches(pattern: &str, text: &str, match_path_components: bool) -> bool {
    let pat: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let txt: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();

    let mut p = 0;
    let mut t = 0;
    // Most recent star: position after it in the pattern, and the text
    // position it is currently anchored at.
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        let direct = p < pat.len()
            && (pat[p] == txt[t]
                || (pat[p] == '?' && (match_path_components || txt[t] != '/')));
        if direct {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some((p + 1, t));
            p += 1;
        } else if let Some((after, anchor)) = star {
            // Widen the star by one character and retry from there.
            if !match_path_components && txt[anchor] == '/' {
                return false;
            }
            p = after;
            t = anchor + 1;
            star = Some((after, anchor + 1));
        } else {
            return false;
        }
    }
    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}
