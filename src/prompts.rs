pub const VIDEO_SYSTEM: &str = include_str!("../data/prompts/video_system.txt");
pub const BOX_2D_DETECTION: &str = include_str!("../data/prompts/box_2d_detection.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// The 2D bounding-box prompt used by the spatial demo.
pub fn box_2d_detection(target: &str, label: Option<&str>) -> String {
    let label = label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("a text label");
    render(BOX_2D_DETECTION, &[("target", target.trim()), ("label", label)])
}
