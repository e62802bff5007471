use std::process;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use fetchbot::api::{ApiClient, ApiError};
use fetchbot::model::{
    CreateScanRequest, FindingFilters, FindingStatus, FindingsPage, LogEntry, ReportFormat, Scan,
    ScanStatus, Severity, SeverityCounts,
};
use fetchbot::session::SessionState;
use fetchbot::sync::{ResourceKind, ScanSource, ScanWatcher, SinkRef, SyncCache, WatchSink};
use fetchbot::ClientConfig;

#[derive(Parser, Debug)]
#[command(
    name = "fetchbot",
    version,
    about = "Client for the Fetchbot security-scanning platform",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Log in:                 fetchbot login --email you@corp.com --password secret
  Start a scan:           fetchbot scan https://target.com
  Start and tail:         fetchbot scan https://target.com --watch
  Tail a running scan:    fetchbot watch 4f2a9c
  Findings (filtered):    fetchbot findings 4f2a9c --severity critical --severity high
  Triage a finding:       fetchbot resolve 1337 --status false_positive
  Export a report:        fetchbot report 4f2a9c --format pdf --output report.pdf
  Dashboard numbers:      fetchbot stats"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "FETCHBOT_API_URL",
        default_value = "https://api.fetchbot.dev",
        help = "Base URL of the Fetchbot API"
    )]
    api_url: String,

    #[arg(long, global = true, default_value_t = 15, help = "Request timeout in seconds")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, help = "Organization name for the new account")]
        organization: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Start a scan against a target
    Scan {
        target: String,
        #[arg(long, default_value = "full",
            value_parser = clap::builder::PossibleValuesParser::new(
                ["full", "quick", "deep", "api", "web", "mobile"]),
            help = "Scan type")]
        scan_type: String,
        #[arg(long, help = "Tail the scan live after starting it")]
        watch: bool,
    },
    /// List all scans
    Scans,
    /// One-shot status for a scan
    Status { job_id: String },
    /// Live-tail a running scan: status, execution logs, findings
    Watch { job_id: String },
    /// List findings for a scan
    Findings {
        job_id: String,
        #[arg(long, help = "Filter by severity (repeatable)")]
        severity: Vec<Severity>,
    },
    /// Show one finding in full
    Finding { id: u64 },
    /// Update a finding's lifecycle status
    Resolve {
        id: u64,
        #[arg(long, default_value = "resolved",
            value_parser = clap::value_parser!(FindingStatus))]
        status: FindingStatus,
    },
    /// Ask the server to pause a scan
    Pause { job_id: String },
    /// Ask the server to resume a paused scan
    Resume { job_id: String },
    /// Ask the server to cancel a scan
    Cancel { job_id: String },
    /// Generate a report for a scan
    Report {
        job_id: String,
        #[arg(long, default_value = "pdf",
            value_parser = clap::value_parser!(ReportFormat),
            help = "Report format: pdf, html, json or markdown")]
        format: ReportFormat,
        #[arg(long, help = "Download the rendered report to this file")]
        output: Option<std::path::PathBuf>,
    },
    /// Delete a scan and everything recorded for it
    Delete { job_id: String },
    /// Dashboard statistics
    Stats,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", format!("[!] {}", e).red());
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig {
        base_url: cli.api_url,
        timeout_secs: cli.timeout,
        ..Default::default()
    };
    let session = Arc::new(SessionState::load(SessionState::default_path()));
    let client = Arc::new(ApiClient::new(&config, Arc::clone(&session))?);

    match cli.command {
        Command::Login { email, password } => {
            let response = client.login(&email, &password).await?;
            println!(
                "{}",
                format!("[+] Logged in as {}", response.user.email).green().bold()
            );
        }
        Command::Register {
            email,
            password,
            organization,
        } => {
            let request = fetchbot::model::RegisterRequest {
                email,
                password,
                organization_name: organization,
            };
            let response = client.register(&request).await?;
            println!(
                "{}",
                format!("[+] Welcome to Fetchbot, {}", response.user.email)
                    .green()
                    .bold()
            );
        }
        Command::Logout => {
            require_auth(&session)?;
            client.logout().await;
            println!("{}", "[+] Logged out.".green());
        }
        Command::Whoami => {
            require_auth(&session)?;
            match client.current_user().await {
                Ok(user) => println!("{}", format!("[+] {}", user.email).green()),
                // Offline fallback: the persisted session still knows who we are.
                Err(ApiError::Transport(_)) => {
                    if let Some(user) = session.user() {
                        println!("{}", format!("[+] {} (cached)", user.email).green());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Scan {
            target,
            scan_type,
            watch,
        } => {
            require_auth(&session)?;
            let request = CreateScanRequest::new(target).with_scan_type(scan_type);
            let scan = client.create_scan(&request).await?;
            println!(
                "{}",
                format!("[+] Scan {} started against {}", scan.job_id, scan.target)
                    .green()
                    .bold()
            );
            if watch {
                watch_scan(Arc::clone(&client), &config, &scan.job_id).await?;
            }
        }
        Command::Scans => {
            require_auth(&session)?;
            let scans = client.list_scans().await?;
            if scans.is_empty() {
                println!("{}", "[*] No scans yet.".dimmed());
            }
            for scan in &scans {
                print_scan_line(scan);
            }
        }
        Command::Status { job_id } => {
            require_auth(&session)?;
            let scan = client.get_scan(&job_id).await?;
            print_scan_detail(&scan);
        }
        Command::Watch { job_id } => {
            require_auth(&session)?;
            watch_scan(Arc::clone(&client), &config, &job_id).await?;
        }
        Command::Findings { job_id, severity } => {
            require_auth(&session)?;
            let filters = FindingFilters {
                severity,
                ..Default::default()
            };
            let scan = client.get_scan(&job_id).await?;
            match client.scan_findings(&job_id, Some(&filters)).await {
                Ok(page) => print_findings(&page, scan.status),
                Err(ApiError::NotFound) => {
                    println!("{}", "[*] No findings recorded for this scan yet.".dimmed());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Finding { id } => {
            require_auth(&session)?;
            let detail = client.get_finding(id).await?;
            print_finding_detail(&detail);
        }
        Command::Resolve { id, status } => {
            require_auth(&session)?;
            let finding = client.update_finding_status(id, status).await?;
            println!(
                "{}",
                format!("[+] Finding #{} is now {}", finding.id, finding.status).green()
            );
        }
        Command::Pause { job_id } => {
            require_auth(&session)?;
            let scan = client.pause_scan(&job_id).await?;
            println!("[*] Pause requested; server reports {}", scan.status);
        }
        Command::Resume { job_id } => {
            require_auth(&session)?;
            let scan = client.resume_scan(&job_id).await?;
            println!("[*] Resume requested; server reports {}", scan.status);
        }
        Command::Cancel { job_id } => {
            require_auth(&session)?;
            let scan = client.cancel_scan(&job_id).await?;
            println!("[*] Cancel requested; server reports {}", scan.status);
        }
        Command::Report {
            job_id,
            format,
            output,
        } => {
            require_auth(&session)?;
            let report = client.generate_report(&job_id, format).await?;
            match output {
                Some(path) => {
                    let bytes = client.download_report(&report.report_url).await?;
                    std::fs::write(&path, &bytes)?;
                    println!(
                        "{}",
                        format!("[+] Report written to {}", path.display())
                            .green()
                            .bold()
                    );
                }
                None => {
                    println!("{}", format!("[+] Report ready: {}", report.report_url).green());
                    if let Some(at) = report.generated_at {
                        println!("    Generated: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
            }
        }
        Command::Delete { job_id } => {
            require_auth(&session)?;
            client.delete_scan(&job_id).await?;
            println!("{}", format!("[+] Scan {} deleted.", job_id).green());
        }
        Command::Stats => {
            require_auth(&session)?;
            let stats = client.dashboard_stats().await?;
            print_stats(&stats);
        }
    }

    Ok(())
}

fn require_auth(session: &SessionState) -> anyhow::Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!(
            "not logged in. Run 'fetchbot login --email <email> --password <password>' first"
        );
    }
    Ok(())
}

/// Tails a scan until it reaches a terminal state. Ctrl-C tears the watcher
/// down cleanly (dropping it aborts every refresh task).
async fn watch_scan(
    client: Arc<ApiClient>,
    config: &ClientConfig,
    job_id: &str,
) -> anyhow::Result<()> {
    let cache = Arc::new(SyncCache::new());
    let sink: SinkRef = Arc::new(ConsoleSink::new(job_id));

    let watcher = ScanWatcher::spawn(
        client as Arc<dyn ScanSource>,
        Arc::clone(&cache),
        sink,
        job_id,
        config.poll_config(),
    )?;

    tokio::select! {
        _ = watcher.wait() => {
            print_watch_summary(&cache, job_id);
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", "[*] Watch cancelled.".yellow());
        }
    }
    Ok(())
}

/// Terminal sink for `watch`: progress bar for the status line, log lines
/// and finding counts printed above it.
struct ConsoleSink {
    bar: ProgressBar,
    last_total: AtomicU64,
}

impl ConsoleSink {
    fn new(job_id: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(ProgressStyle::default_bar());
        bar.set_message(format!("waiting for scan {}", job_id));
        Self {
            bar,
            last_total: AtomicU64::new(0),
        }
    }
}

impl WatchSink for ConsoleSink {
    fn on_status(&self, scan: &Scan) {
        self.bar.set_position(u64::from(scan.progress.min(100)));
        self.bar
            .set_message(format!("{} {}", scan.status, scan.target));
    }

    fn on_findings(&self, page: &FindingsPage) {
        // Only worth a line when the count moved.
        let previous = self.last_total.swap(page.total, Relaxed);
        if page.total > previous {
            let counts = page.severity_counts();
            self.bar.println(
                format!(
                    "[+] {} finding(s) so far ({} critical / {} high / {} medium / {} low)",
                    page.total, counts.critical, counts.high, counts.medium, counts.low
                )
                .red()
                .bold()
                .to_string(),
            );
        }
    }

    fn on_log(&self, entry: &LogEntry) {
        let action = colorize_action(&entry.action);
        self.bar.println(format!(
            "{} {} {}  {}",
            entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
            entry.agent.cyan(),
            action,
            entry.details.dimmed()
        ));
    }

    fn on_terminal(&self, scan: &Scan) {
        let label = match scan.status {
            ScanStatus::Completed => "completed".green().bold(),
            ScanStatus::Failed => "failed".red().bold(),
            other => other.as_str().normal(),
        };
        self.bar.finish_with_message(format!("scan {}", label));
    }

    fn on_poll_error(&self, kind: ResourceKind, error: &ApiError) {
        if matches!(error, ApiError::Unauthorized) {
            self.bar.println(
                format!("[!] {} poll rejected: session expired, log in again", kind)
                    .red()
                    .to_string(),
            );
        }
    }
}

fn colorize_action(action: &str) -> ColoredString {
    if action.contains("Vulnerability") || action.contains("Found") || action.contains("Failed") {
        action.red()
    } else if action.contains("Completed") {
        action.green()
    } else if action.contains("Started") || action.contains("Running") {
        action.blue()
    } else {
        action.normal()
    }
}

fn print_watch_summary(cache: &SyncCache, job_id: &str) {
    let scan_view = cache.scan(job_id);
    let findings_view = cache.findings(job_id, None);

    let Some(scan) = scan_view.data else {
        println!("{}", "[!] No scan data received.".red());
        return;
    };

    println!();
    match scan.status {
        ScanStatus::Completed => {
            println!("{}", format!("[+] Scan {} completed.", job_id).green().bold());
        }
        ScanStatus::Failed => {
            println!("{}", format!("[!] Scan {} failed.", job_id).red().bold());
        }
        other => {
            println!("[*] Scan {} ended in state '{}'.", job_id, other);
        }
    }
    if let Some(duration) = scan.duration_secs {
        println!("    Duration: {}s", duration);
    }

    match findings_view.data {
        Some(page) if !page.findings.is_empty() => {
            print_findings(&page, scan.status);
        }
        _ if scan.status == ScanStatus::Completed => {
            println!("{}", "[+] No vulnerabilities found.".green().bold());
        }
        _ => {
            println!("{}", "[*] No findings reported.".dimmed());
        }
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".bright_red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".blue(),
        Severity::Info => "INFO".dimmed(),
    }
}

fn status_label(status: ScanStatus) -> ColoredString {
    match status {
        ScanStatus::Queued => "queued".yellow(),
        ScanStatus::Running => "running".blue().bold(),
        ScanStatus::Completed => "completed".green(),
        ScanStatus::Failed => "failed".red(),
        ScanStatus::Unknown => "unknown".dimmed(),
    }
}

fn print_scan_line(scan: &Scan) {
    let findings = scan
        .total_findings
        .map(|n| format!("{} finding(s)", n))
        .unwrap_or_default();
    println!(
        "{}  {:9}  {:3}%  {}  {}",
        scan.job_id.bold(),
        status_label(scan.status),
        scan.progress,
        scan.target,
        findings.dimmed()
    );
}

fn print_scan_detail(scan: &Scan) {
    println!("{}  {}", scan.job_id.bold(), status_label(scan.status));
    println!("    Target:    {}", scan.target);
    if let Some(scan_type) = &scan.scan_type {
        println!("    Type:      {}", scan_type);
    }
    println!("    Progress:  {}%", scan.progress);
    if let Some(created) = scan.created_at {
        println!("    Started:   {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(completed) = scan.completed_at {
        println!("    Completed: {}", completed.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(duration) = scan.duration_secs {
        println!("    Duration:  {}s", duration);
    }
    if let Some(counts) = scan.by_severity {
        print_severity_counts(&counts);
    }
}

fn print_findings(page: &FindingsPage, scan_status: ScanStatus) {
    if page.findings.is_empty() {
        if scan_status == ScanStatus::Completed {
            // Positive empty state: the scan finished clean.
            println!("{}", "[+] No vulnerabilities found.".green().bold());
        } else {
            println!("{}", "[*] No findings yet. The scan is still working.".dimmed());
        }
        return;
    }

    for finding in &page.findings {
        println!(
            "#{:<6} {:18} {:15} {}",
            finding.id,
            severity_label(finding.severity),
            finding.status.as_str().dimmed(),
            finding.title
        );
        if !finding.affected_url.is_empty() {
            println!("        {}", finding.affected_url.dimmed());
        }
    }
    print_severity_counts(&page.severity_counts());
}

fn print_severity_counts(counts: &SeverityCounts) {
    println!(
        "    {} total: {} / {} / {} / {} / {}",
        counts.total(),
        format!("{} critical", counts.critical).red(),
        format!("{} high", counts.high).bright_red(),
        format!("{} medium", counts.medium).yellow(),
        format!("{} low", counts.low).blue(),
        format!("{} info", counts.info).dimmed()
    );
}

fn print_finding_detail(detail: &fetchbot::model::FindingDetail) {
    let finding = &detail.finding;
    println!(
        "#{} {} {}",
        finding.id,
        severity_label(finding.severity),
        finding.title.bold()
    );
    println!("    Status:      {}", finding.status);
    if let Some(finding_type) = &finding.finding_type {
        println!("    Type:        {}", finding_type);
    }
    if !finding.description.is_empty() {
        println!("    Description: {}", finding.description);
    }
    if !finding.affected_url.is_empty() {
        println!("    URL:         {}", finding.affected_url);
    }
    if let Some(payload) = &finding.payload {
        println!("    Payload:     {}", payload.yellow());
    }
    if let Some(evidence) = &finding.evidence {
        println!("    Evidence:    {}", evidence);
    }
    if let Some(remediation) = &finding.remediation {
        println!("    Remediation: {}", remediation.green());
    }
    if let Some(scan) = &detail.scan {
        println!("    Scan:        {} ({})", scan.job_id, scan.target);
    }
}

fn print_stats(stats: &fetchbot::model::DashboardStats) {
    println!("{}", "[+] Dashboard".bold());
    println!(
        "    Scans:    {} total, {} running, {} completed, {} failed",
        stats.total_scans,
        stats.running_scans.to_string().blue(),
        stats.completed_scans.to_string().green(),
        stats.failed_scans.to_string().red()
    );
    println!("    Findings: {}", stats.total_findings);
    print_severity_counts(&stats.by_severity);

    if !stats.recent_scans.is_empty() {
        println!("{}", "[+] Recent scans".bold());
        for recent in &stats.recent_scans {
            println!(
                "    {}  {:9}  {}",
                recent.job_id,
                status_label(recent.status),
                recent.target
            );
        }
    }
    if !stats.recent_findings.is_empty() {
        println!("{}", "[+] Recent findings".bold());
        for recent in &stats.recent_findings {
            println!(
                "    #{:<6} {:18} {}",
                recent.id,
                severity_label(recent.severity),
                recent.title
            );
        }
    }
}
