use actionlens_core::practices::PracticeVerdict;
use actionlens_core::reference::ClassifiedRef;
use actionlens_core::repo::RepoReport;
use actionlens_core::scan::WorkflowContextReport;
use colored::*;

/// Print the full practice report for one repository.
pub fn print_repo_report(report: &RepoReport) {
    println!();
    println!(
        "{}",
        format!(
            " actionlens v{} — {}/{}",
            env!("CARGO_PKG_VERSION"),
            report.owner,
            report.repository
        )
        .bold()
    );
    println!();

    println!(" {}", "Workflows".bold().underline());
    if report.workflows.is_empty() {
        println!(" {} none found", "|-".dimmed());
    }
    for workflow in &report.workflows {
        if workflow.valid {
            let labeled_steps = workflow
                .context
                .as_ref()
                .map(|c| {
                    c.jobs
                        .iter()
                        .flat_map(|j| j.steps.iter())
                        .filter(|s| !s.labels.is_empty())
                        .count()
                })
                .unwrap_or(0);
            println!(
                " {} {} ({} labeled step{})",
                "|-".dimmed(),
                workflow.file,
                labeled_steps,
                if labeled_steps == 1 { "" } else { "s" }
            );
        } else {
            println!(
                " {} {} {}",
                "|-".dimmed(),
                workflow.file,
                format!(
                    "invalid: {}",
                    workflow.invalid_reason.as_deref().unwrap_or("unknown")
                )
                .red()
            );
        }
    }
    println!();

    println!(" {}", "Security Practices".bold().underline());
    print_practice("P1 code-review ownership", &report.practices.ownership);
    print_practice(
        "P2 injection mitigation",
        &report.practices.injection_mitigation,
    );
    print_practice("P3 supply-chain scorecard", &report.practices.scorecard);
    print_practice("P4 action pinning", &report.practices.pinning);
    println!();

    if !report.pinning_detail.is_empty() {
        println!(" {}", "Third-Party References".bold().underline());
        for classified in &report.pinning_detail {
            print_classification_line(classified);
        }
        println!();
    }
}

fn print_practice(label: &str, verdict: &PracticeVerdict) {
    let status = match (verdict.is_target, verdict.is_implemented) {
        (false, _) => "N/A".dimmed(),
        (true, Some(true)) => "OK".green().bold(),
        (true, _) => "MISSING".red().bold(),
    };
    println!(" {} {:<28} {}", "|-".dimmed(), label, status);
}

/// Print a classification result for one action reference.
pub fn print_classification(classified: &ClassifiedRef) {
    print_classification_line(classified);
}

fn print_classification_line(classified: &ClassifiedRef) {
    let pinned = if classified.pinned {
        "pinned".green()
    } else {
        "unpinned".red()
    };
    println!(
        " {} {} [{}] {}",
        "|-".dimmed(),
        classified.reference,
        classified.kind.as_str().cyan(),
        pinned
    );
}

/// Print the per-step context breakdown for one workflow.
pub fn print_context_report(source: &str, report: &WorkflowContextReport) {
    println!();
    println!("{}", format!(" actionlens — {}", source).bold());
    println!();

    if !report.use_github_context {
        println!(" {} workflow does not reference event context", "OK".green().bold());
        return;
    }

    if !report.global_env.is_empty() {
        println!(" {}", "Tainted workflow env".bold().underline());
        for var in &report.global_env {
            println!(" {} {}", "|-".dimmed(), var.name.yellow());
        }
        println!();
    }

    for job in &report.jobs {
        println!(" {}", format!("Job: {}", job.job).bold().underline());
        for var in &job.job_env {
            println!(" {} env {}", "|-".dimmed(), var.name.yellow());
        }
        for step in &job.steps {
            if step.labels.is_empty() {
                continue;
            }
            let labels: Vec<&str> = step.labels.iter().map(|l| l.as_str()).collect();
            let risky = step.labels.iter().any(|l| l.is_injection_risk());
            let rendered = labels.join(", ");
            println!(
                " {} step {}: {}",
                "|-".dimmed(),
                step.index,
                if risky { rendered.red() } else { rendered.yellow() }
            );
        }
        println!();
    }
}
