use std::{env, path::PathBuf, process};

use anyhow::Context;
use serde::Serialize;

use axisfix::document::{AssetDocument, ClipDocument, SceneDocument};
use axisfix::{
    AssetUserData, AxisConversionPostprocessor, ClipConversionReport, ImportOptions,
    SceneConversionReport,
};

#[derive(Serialize)]
struct ConversionReport {
    scene: SceneConversionReport,
    clips: Vec<ClipConversionReport>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: axisfix <input.json> <output.json>");
        process::exit(2);
    }

    let input = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);

    let document = AssetDocument::load(&input)?;
    let user_data = AssetUserData::deserialize(&document.user_data)?;
    let hooks = AxisConversionPostprocessor::from_user_data(&user_data);
    let options = ImportOptions {
        import_tangents: document.import_tangents,
    };

    let mut scene = document.scene.into_scene().context("invalid scene graph")?;
    let scene_report = hooks.on_postprocess_model(&mut scene, &options);

    let mut clips = Vec::with_capacity(document.clips.len());
    let mut clip_reports = Vec::with_capacity(document.clips.len());
    for clip in document.clips {
        let mut clip = clip.into_clip();
        clip_reports.push(hooks.on_postprocess_animation(&mut clip));
        clips.push(ClipDocument::from_clip(&clip));
    }

    let converted = AssetDocument {
        scene: SceneDocument::from_scene(&scene),
        clips,
        user_data: document.user_data,
        import_tangents: document.import_tangents,
    };
    converted.save(&output)?;

    let report = ConversionReport {
        scene: scene_report,
        clips: clip_reports,
    };
    let report_path = output.with_extension("report.json");
    let content =
        serde_json::to_string_pretty(&report).context("failed to serialize conversion report")?;
    std::fs::write(&report_path, content)
        .with_context(|| format!("failed to write report: {}", report_path.display()))?;

    let scene = &report.scene;
    println!(
        "Axis conversion: {} (flip front axis: {})",
        if scene.applied { "applied" } else { "disabled" },
        scene.flip_z_axis
    );
    println!(
        "Nodes: {}, removed: {}, snapped: {}",
        scene.remapped_node_count,
        scene.deleted_nodes.len(),
        scene.snapped_nodes.len()
    );
    println!(
        "Meshes: {}, bind pose sets: {}",
        scene.mesh_count, scene.bind_pose_mesh_count
    );
    for clip in &report.clips {
        println!(
            "Clip '{}': {} groups remapped, {} rejected",
            clip.clip_name, clip.remapped_groups, clip.rejected_groups
        );
    }
    let issue_count =
        scene.issues.len() + report.clips.iter().map(|clip| clip.issues.len()).sum::<usize>();
    println!("Issues: {} (see {})", issue_count, report_path.display());

    Ok(())
}
