use attack_path_viz::config::Config;
use attack_path_viz::layout::compute_layout;
use attack_path_viz::parser::parse_graph_text;
use attack_path_viz::render::render_svg;
use attack_path_viz::shell::render_attack_visualization;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

/// `levels` rows of `width` nodes; each node feeds the two nearest nodes below.
fn layered_graph_text(levels: usize, width: usize) -> String {
    let mut out = String::from("graph TD\n");
    for level in 0..levels.saturating_sub(1) {
        for i in 0..width {
            for j in [i, (i + 1) % width] {
                out.push_str(&format!(
                    "  N{level}_{i}[Step {level}.{i}] -->|uses| N{}_{j}[Step {}.{j}]\n",
                    level + 1,
                    level + 1
                ));
            }
        }
    }
    out
}

fn layered_structured(levels: usize, width: usize) -> Value {
    let kinds = ["principal", "resource", "payload", "outcome"];
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for level in 0..levels {
        for i in 0..width {
            nodes.push(json!({
                "id": format!("N{level}_{i}"),
                "label": format!("Step {level}.{i}"),
                "type": kinds[level % kinds.len()],
                "description": "Requires `iam:PassRole` and **one** of:\n- lambda:CreateFunction\n- ec2:RunInstances",
            }));
            if level + 1 < levels {
                edges.push(json!({
                    "from": format!("N{level}_{i}"),
                    "to": format!("N{}_{}", level + 1, (i + 1) % width),
                    "label": "grants",
                    "branch": i % 3 == 0,
                }));
            }
        }
    }
    json!({ "nodes": nodes, "edges": edges })
}

const SIZES: [(&str, usize, usize); 3] = [("small", 4, 2), ("medium", 8, 6), ("large", 20, 12)];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, levels, width) in SIZES {
        let input = layered_graph_text(levels, width);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| black_box(parse_graph_text(black_box(data))));
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = Config::default();
    for (name, levels, width) in SIZES {
        let graph = parse_graph_text(&layered_graph_text(levels, width));
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, data| {
            b.iter(|| {
                black_box(compute_layout(
                    black_box(data),
                    &config.theme,
                    &config.layout,
                ))
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_svg");
    let config = Config::default();
    for (name, levels, width) in SIZES {
        let graph = parse_graph_text(&layered_graph_text(levels, width));
        let layout = compute_layout(&graph, &config.theme, &config.layout);
        group.bench_with_input(BenchmarkId::from_parameter(name), &layout, |b, data| {
            b.iter(|| {
                let svg = render_svg(data, &config.theme, &config.layout, &config.render)
                    .expect("render failed");
                black_box(svg)
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end_html");
    let config = Config::default();
    for (name, levels, width) in SIZES {
        let input = layered_structured(levels, width);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let mount = render_attack_visualization("bench-001", black_box(data), &config);
                black_box(mount.to_html())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_layout,
    bench_render,
    bench_end_to_end
);
criterion_main!(benches);
