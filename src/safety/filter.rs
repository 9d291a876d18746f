//! Redaction of host details from interpreter text output.
//!
//! Path redaction runs first and may swallow text a later pattern would have
//! matched (for example `/srv/10.0.0.1`). That overlap is kept as is.

use std::sync::OnceLock;

use regex::Regex;

pub const PATH_MARKER: &str = "[REDACTED_PATH]";
pub const ENV_MARKER: &str = "[REDACTED_ENV]";
pub const IP_MARKER: &str = "[REDACTED_IP]";
pub const EMAIL_MARKER: &str = "[REDACTED_EMAIL]";

struct Redaction {
    re: Regex,
    marker: &'static str,
}

fn redactions() -> &'static [Redaction] {
    static RULES: OnceLock<Vec<Redaction>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"/[^\s:]+", PATH_MARKER),
            (r"\b[A-Z][A-Z0-9_]+=\S*", ENV_MARKER),
            (r"\b(?:\d{1,3}\.){3}\d{1,3}\b", IP_MARKER),
            (r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}", EMAIL_MARKER),
        ]
        .into_iter()
        .map(|(pattern, marker)| Redaction {
            re: Regex::new(pattern).expect("redaction patterns are constant"),
            marker,
        })
        .collect()
    })
}

pub fn filter_output(text: &str) -> String {
    let mut out = text.to_string();
    for rule in redactions() {
        if rule.re.is_match(&out) {
            out = rule.re.replace_all(&out, rule.marker).into_owned();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_output_is_untouched() {
        let text = "ans = 6\nA =\n\n   1   2\n   3   4\n";
        assert_eq!(filter_output(text), text);
    }

    #[test]
    fn paths_are_redacted() {
        let out = filter_output("error: load: unable to find file /home/alice/data.mat");
        assert_eq!(out, format!("error: load: unable to find file {PATH_MARKER}"));
    }

    #[test]
    fn path_stops_at_colon() {
        let out = filter_output("error: /usr/share/octave/x.m: parse error");
        assert_eq!(out, format!("error: {PATH_MARKER}: parse error"));
    }

    #[test]
    fn env_assignments_are_redacted() {
        let out = filter_output("HOME_DIR=secret and API_KEY=abc123 remain");
        assert_eq!(out, format!("{ENV_MARKER} and {ENV_MARKER} remain"));
    }

    #[test]
    fn ip_and_email_are_redacted() {
        let out = filter_output("host 192.168.1.20 owner ops@example.com");
        assert_eq!(out, format!("host {IP_MARKER} owner {EMAIL_MARKER}"));
    }

    #[test]
    fn path_runs_before_other_patterns() {
        // the IP sits inside the path window and goes with it
        let out = filter_output("see /srv/10.0.0.1/log");
        assert_eq!(out, format!("see {PATH_MARKER}"));
    }

    #[test]
    fn filtering_is_idempotent() {
        let samples = [
            "plain text",
            "at /tmp/octave-plot-1/plot.png line 3",
            "PATH=/usr/bin USER_NAME=root 127.0.0.1 me@host.org",
            "mixed: a@b.io/x FOO_BAR=1.2.3.4",
        ];
        for s in samples {
            let once = filter_output(s);
            assert_eq!(filter_output(&once), once, "{s}");
        }
    }
}
