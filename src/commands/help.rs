//! Usage text.

pub fn display_help() {
    log_version!();
    log_block_start!("Usage: growlight [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>        Use <dir>/growlight.toml");
    log_indented!("-d, --debug               Log every sample and decision");
    log_indented!("-l, --log <file>          Write the log to <file>");
    log_indented!("-S, --simulate <start> <end> [multiplier]");
    log_indented!("                          Run on a simulated clock (\"YYYY-MM-DD HH:MM:SS\")");
    log_indented!("    --stopped             Wait for `growlight start` before deciding");
    log_indented!("    --json                JSON output for `status`");
    log_indented!("-h, --help                Show this help");
    log_indented!("-V, --version             Show the version");
    log_block_start!("Commands:");
    log_indented!("start | stop              Begin or suspend automatic control");
    log_indented!("auto | manual             Switch operation");
    log_indented!("led on | led off          Drive the LED by hand (manual only)");
    log_indented!("reload                    Re-read the configuration");
    log_indented!("status                    Show the current mode and LED state");
    log_indented!("summary [YYYY-MM-DD]      Daily LED on-time with running total");
    log_indented!("prune <YYYY-MM-DD>        Delete ledger records before a date");
    log_end!();
}
