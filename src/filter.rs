// Image exclusion filters

/// Predicate over image references. `true` means the container is excluded
/// and never enters the registry.
pub trait ImageFilter: Send + Sync {
    fn excludes(&self, image: &str) -> bool;
}

impl<F> ImageFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn excludes(&self, image: &str) -> bool {
        self(image)
    }
}

/// Exclusion list of glob patterns (`*` any run, `?` one char).
///
/// A pattern prefixed with `!` re-includes what an earlier pattern excluded.
/// Patterns are checked in order and the last one that matches decides.
#[derive(Debug, Clone, Default)]
pub struct ImagePatternFilter {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    negated: bool,
}

impl ImagePatternFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref().trim();
                let (negated, pattern) = match p.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, p),
                };
                (!pattern.is_empty()).then(|| Rule {
                    pattern: pattern.to_string(),
                    negated,
                })
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ImageFilter for ImagePatternFilter {
    fn excludes(&self, image: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|r| glob_match(&r.pattern, image))
            .is_some_and(|r| !r.negated)
    }
}

/// Iterative wildcard match with single-star backtracking.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_wildcards() {
        assert!(glob_match("nginx", "nginx"));
        assert!(!glob_match("nginx", "nginx:1.27"));
        assert!(glob_match("nginx*", "nginx:1.27"));
        assert!(glob_match("*pause*", "registry.k8s.io/pause:3.9"));
        assert!(glob_match("redis:?", "redis:7"));
        assert!(!glob_match("redis:?", "redis:7.2"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("a*b", "acd"));
    }

    #[test]
    fn empty_filter_excludes_nothing() {
        let f = ImagePatternFilter::new(Vec::<String>::new());
        assert!(f.is_empty());
        assert!(!f.excludes("anything"));
    }

    #[test]
    fn negation_reincludes_and_last_match_wins() {
        let f = ImagePatternFilter::new(["registry.local/*", "!registry.local/keep-*"]);
        assert!(f.excludes("registry.local/tmp"));
        assert!(!f.excludes("registry.local/keep-me"));
        assert!(!f.excludes("docker.io/library/nginx"));
    }

    #[test]
    fn blank_patterns_are_ignored() {
        let f = ImagePatternFilter::new(["", "  ", "!"]);
        assert!(f.is_empty());
    }

    #[test]
    fn closures_are_filters() {
        let f = |image: &str| image.starts_with("busybox");
        assert!(ImageFilter::excludes(&f, "busybox:latest"));
        assert!(!ImageFilter::excludes(&f, "alpine"));
    }
}
