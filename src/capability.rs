use crate::config::Target;

#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub auto_probe: bool,
    pub requested: Target,
    pub target: Target,
    notes: Vec<String>,
}

impl CapabilityReport {
    pub fn changed(&self) -> bool {
        self.target != self.requested
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn status_label(&self) -> String {
        if !self.auto_probe {
            return format!("off (target={:?})", self.target);
        }
        if self.changed() {
            return format!("fallback {:?}->{:?}", self.requested, self.target);
        }
        format!("ok target={:?}", self.target)
    }
}

/// Pick the presentation target, falling back to half-block cells when the
/// terminal does not look like it speaks the kitty graphics protocol.
pub fn probe_target(requested: Target, auto_probe: bool) -> CapabilityReport {
    probe_target_with(requested, auto_probe, |k| std::env::var(k).ok())
}

pub fn probe_target_with(
    requested: Target,
    auto_probe: bool,
    env: impl Fn(&str) -> Option<String>,
) -> CapabilityReport {
    let mut report = CapabilityReport {
        auto_probe,
        requested,
        target: requested,
        notes: Vec::new(),
    };

    if !auto_probe {
        report.push_note("capability probe disabled by --auto-probe=false");
        return report;
    }

    if requested == Target::Kitty && !kitty_graphics_available(&env) {
        report.target = Target::HalfBlock;
        report.push_note(
            "kitty graphics unavailable in this terminal; falling back to half-block target",
        );
    }

    if report.notes.is_empty() {
        report.push_note("probe selected requested target with no fallback");
    }

    report
}

fn kitty_graphics_available(env: &impl Fn(&str) -> Option<String>) -> bool {
    if let Some(v) = env("FXLOOP_FORCE_KITTY") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => return true,
            "0" | "false" | "no" | "off" => return false,
            _ => {}
        }
    }

    if env("KITTY_WINDOW_ID").is_some() {
        return true;
    }

    let term = env("TERM").unwrap_or_default().to_ascii_lowercase();
    if term.contains("kitty") {
        return true;
    }

    let term_program = env("TERM_PROGRAM").unwrap_or_default().to_ascii_lowercase();
    ["ghostty", "kitty", "wezterm"]
        .iter()
        .any(|name| term_program.contains(name))
}
