use super::payload::Mode;

/// Instructions element that opens every payload.
pub fn instructions(mode: Mode) -> String {
    format!(
        "ROLE: Senior Technical Lead.
GOAL: Create a 'State Snapshot' for a project handoff.
MODE: {mode_label}
INSTRUCTIONS:
1. Read all files (including those extracted from ZIPs).
2. Identify the LATEST state. Ignore old errors if newer code fixes them.
3. Output a clean Markdown 'SYSTEM INJECTION' prompt containing:
   - Project Summary
   - Current Active Code (Only relevant parts)
   - Known Issues
   - Immediate Next Step",
        mode_label = mode.label()
    )
}
