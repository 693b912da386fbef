//! PlantDoc - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use plantdoc::cli::{Args, Commands, Verbosity};
use plantdoc::communication::{CommunicationAdapter, CommunicationProfile, ExpertiseTier};
use plantdoc::diagnosis::Severity;
use plantdoc::doctor::Doctor;
use plantdoc::pipeline::DiagnosisPipeline;
use plantdoc::quality::QualityAssessment;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!("plantdoc={}", args.verbosity().log_level());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    match &args.command {
        Commands::Check { image } => {
            run_check(&args, image).await?;
        }
        Commands::Diagnose {
            image,
            symptoms,
            count,
            force,
        } => {
            run_diagnose(&args, image, symptoms.as_deref(), *count, *force).await?;
        }
        Commands::Tips { plant } => {
            run_tips(&args, plant).await?;
        }
        Commands::Doctor => {
            run_doctor(&args).await?;
        }
        Commands::Config => {
            show_config(&args)?;
        }
    }

    Ok(())
}

/// Check photo framing without spending a full diagnosis
async fn run_check(args: &Args, image: &Path) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let bytes = read_image(image)?;

    let pb = start_spinner(args.verbosity(), "Checking photo...");
    let assessment = pipeline.assess_photo(&bytes).await?;
    finish_spinner(pb);

    let threshold = pipeline.config().tuning.quality_threshold;
    render_assessment(&assessment, threshold, args.verbosity());
    maybe_show_stats(args, &pipeline);

    if !assessment.accepted {
        std::process::exit(1);
    }

    Ok(())
}

/// Full diagnosis: quality gate, model call, tier adaptation
async fn run_diagnose(
    args: &Args,
    image: &Path,
    symptoms: Option<&str>,
    count: u32,
    force: bool,
) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let bytes = read_image(image)?;

    if !force {
        let pb = start_spinner(args.verbosity(), "Checking photo...");
        let assessment = pipeline.assess_photo(&bytes).await?;
        finish_spinner(pb);

        if !assessment.accepted {
            let threshold = pipeline.config().tuning.quality_threshold;
            render_assessment(&assessment, threshold, args.verbosity());
            println!(
                "{}",
                "Retake the photo, or pass --force to diagnose anyway.".yellow()
            );
            std::process::exit(1);
        }
    }

    let pb = start_spinner(args.verbosity(), "Analyzing plant health...");
    let result = pipeline.diagnose(&bytes, symptoms).await?;
    finish_spinner(pb);

    let tier = ExpertiseTier::from_diagnosis_count(count);
    let adapter = CommunicationAdapter::new();
    let adapted = adapter.adapt(&result, tier);

    render_diagnosis(&adapted.diagnosis, &adapted.educational_tips, &adapted.badge);
    render_progress(&CommunicationProfile::for_diagnosis_count(count));
    maybe_show_stats(args, &pipeline);

    Ok(())
}

/// Quick care tips for a plant type
async fn run_tips(args: &Args, plant: &str) -> Result<()> {
    let pipeline = build_pipeline(args)?;

    let pb = start_spinner(args.verbosity(), "Fetching care tips...");
    let tips = pipeline.quick_tips(plant).await?;
    finish_spinner(pb);

    println!("\n🌿 {}\n", tips.plant_name.bold());

    println!("Quick tips:");
    for tip in &tips.quick_tips {
        println!("  • {}", tip);
    }

    if !tips.common_mistakes.is_empty() {
        println!("\nCommon mistakes:");
        for mistake in &tips.common_mistakes {
            println!("  ✗ {}", mistake);
        }
    }

    println!("\nDifficulty: {}", tips.difficulty);
    println!();

    maybe_show_stats(args, &pipeline);
    Ok(())
}

async fn run_doctor(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    let doctor = Doctor::new(config);

    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(args: &Args) -> Result<()> {
    let config = args.load_config()?;

    println!("\nPlantDoc Configuration\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!(
        "  Key:      {}",
        if config.has_api_key() {
            "configured"
        } else {
            "not set"
        }
    );
    println!("  Timeout:  {}s", config.api.timeout_secs);
    println!();

    println!("Models:");
    println!("  Vision: {}", config.models.vision);
    println!("  Text:   {}", config.models.text);
    println!();

    println!("Tuning:");
    println!("  Quality threshold: {:.2}", config.tuning.quality_threshold);
    println!("  Max retries:       {}", config.tuning.max_retries);
    println!(
        "  Max image size:    {} MB",
        config.tuning.max_image_bytes / (1024 * 1024)
    );
    println!();

    if let Ok(path) = plantdoc::config::PipelineConfig::config_path() {
        println!("Config file: {}", path.display());
        println!();
    }

    Ok(())
}

fn build_pipeline(args: &Args) -> Result<DiagnosisPipeline> {
    let config = args.load_config()?;
    let pipeline = DiagnosisPipeline::new(config)?;
    Ok(pipeline)
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Cannot read image {}", path.display()))
}

fn start_spinner(verbosity: Verbosity, msg: &str) -> Option<ProgressBar> {
    if !verbosity.show_progress() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Some(pb)
}

fn finish_spinner(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

fn render_assessment(assessment: &QualityAssessment, threshold: f64, verbosity: Verbosity) {
    if assessment.accepted {
        println!("\n{}", assessment.guidance.green());
    } else {
        println!("\n{}", assessment.guidance.yellow());
        for issue in &assessment.issues {
            println!("  • {}", issue);
        }
    }

    println!(
        "\nScore: {:.0}%  (threshold {:.0}%)",
        assessment.overall_score * 100.0,
        threshold * 100.0
    );

    if verbosity.show_stats() {
        let axes = &assessment.axis_scores;
        println!(
            "Axes: lighting {:.1}  focus {:.1}  distance {:.1}  angle {:.1}",
            axes.lighting, axes.focus, axes.distance, axes.angle
        );
    }

    println!();
}

fn render_diagnosis(
    diagnosis: &plantdoc::diagnosis::DiagnosisResult,
    tips: &[String],
    badge: &str,
) {
    let (icon, label) = severity_style(diagnosis.severity);
    println!("\n{} Estado: {}", icon, label);

    if let Some(score) = diagnosis.health_score {
        println!("Salud: {}/100", score);
    }
    println!("Confianza: {:.0}%", diagnosis.confidence * 100.0);

    println!("\n{}", diagnosis.summary);

    if let Some(issue) = &diagnosis.primary_issue {
        println!("\nProblema principal: {}", issue.bold());
    }

    println!("\nRecomendaciones:");
    for (i, rec) in diagnosis.recommendations.iter().enumerate() {
        println!("  {}. {}", i + 1, rec);
    }

    println!("\nPlan semanal:");
    for entry in &diagnosis.weekly_plan {
        println!(
            "  {} {:<10} {}",
            priority_marker(entry.priority),
            entry.day,
            entry.task
        );
    }

    if !tips.is_empty() {
        println!();
        for tip in tips {
            println!("{}", tip.cyan());
        }
    }

    println!("\nNivel: {}", badge);
}

fn render_progress(profile: &CommunicationProfile) {
    if let (Some(next), Some(remaining)) = (profile.next_tier, profile.diagnoses_to_next) {
        println!(
            "{}",
            format!(
                "{} diagnósticos más para alcanzar {}",
                remaining,
                next.badge()
            )
            .dimmed()
        );
    }
    println!();
}

fn maybe_show_stats(args: &Args, pipeline: &DiagnosisPipeline) {
    if args.verbosity().show_stats() {
        println!("{}", pipeline.telemetry().render_summary());
    }
}

fn severity_style(severity: Severity) -> (&'static str, String) {
    match severity {
        Severity::Healthy => ("✅", "Saludable".green().to_string()),
        Severity::Warning => ("⚠️", "Atención".yellow().to_string()),
        Severity::Moderate => ("⚠️", "Cuidado necesario".yellow().to_string()),
        Severity::High | Severity::Critical => ("🚨", "Crítico".red().bold().to_string()),
        Severity::Unknown => ("❓", "Desconocido".dimmed().to_string()),
    }
}

fn priority_marker(priority: plantdoc::diagnosis::PlanPriority) -> &'static str {
    match priority {
        plantdoc::diagnosis::PlanPriority::High => "🔴",
        plantdoc::diagnosis::PlanPriority::Medium => "🟡",
        plantdoc::diagnosis::PlanPriority::Low => "🟢",
    }
}
