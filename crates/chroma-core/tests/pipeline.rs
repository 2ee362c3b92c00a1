//! End-to-end pipeline behavior through the public API.

use chroma_core::{
    BitDepth, ColorSpace, ColorSpaceTransform, Config, Context, Display, DynamicKind,
    ExposureContrastTransform, FileRule, GpuShaderSettings, Look, OptimizationLevel, Processor,
    ProcessorCache, TransferStyle, TransferTransform, Transform, TransformDirection, View,
};

fn scale(factor: f64) -> Transform {
    Transform::matrix([
        factor, 0.0, 0.0, 0.0, //
        0.0, factor, 0.0, 0.0, //
        0.0, 0.0, factor, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ])
}

fn srgb_transform() -> Transform {
    Transform::Transfer(TransferTransform {
        style: TransferStyle::Srgb,
        ..Default::default()
    })
}

fn test_config() -> Config {
    let mut c = Config::new();
    c.set_name("pipeline-test");
    c.add_colorspace(ColorSpace::new("linear")).unwrap();
    c.add_colorspace(ColorSpace::new("half").to_reference(scale(2.0)))
        .unwrap();
    c.add_colorspace(ColorSpace::new("sRGB").from_reference(srgb_transform()))
        .unwrap();
    c.add_colorspace(ColorSpace::new("raw").data(true)).unwrap();
    c.roles_mut().define("reference", "linear");
    c
}

#[test]
fn data_spaces_bypass_conversion() {
    let config = test_config();
    for (src, dst) in [("raw", "sRGB"), ("sRGB", "raw"), ("raw", "half")] {
        let p = config.processor(src, dst).unwrap();
        assert!(p.is_noop(), "{src}->{dst} should be a no-op");
    }
}

#[test]
fn float_round_trip_within_tolerance() {
    let config = test_config();
    let fwd = config.processor("half", "sRGB").unwrap().default_cpu();
    let rev = config.processor("sRGB", "half").unwrap().default_cpu();

    let start = [0.1_f32, 0.35, 0.8];
    let mut px = start;
    fwd.apply_rgb(&mut px);
    rev.apply_rgb(&mut px);
    for (a, b) in start.iter().zip(px.iter()) {
        assert!((a - b).abs() < 1e-5, "{start:?} came back as {px:?}");
    }
}

#[test]
fn u8_round_trip_within_one_code() {
    let config = test_config();
    let fwd = config
        .processor("linear", "sRGB")
        .unwrap()
        .optimized_cpu(BitDepth::U8, OptimizationLevel::Default);
    let rev = config
        .processor("sRGB", "linear")
        .unwrap()
        .optimized_cpu(BitDepth::U8, OptimizationLevel::Default);

    let mut data = [10_u8, 64, 128, 200, 255, 32];
    let original = data;
    fwd.apply_u8(&mut data, 3).unwrap();
    rev.apply_u8(&mut data, 3).unwrap();
    for (a, b) in original.iter().zip(data.iter()) {
        assert!(a.abs_diff(*b) <= 1, "{original:?} came back as {data:?}");
    }
}

#[test]
fn equal_pipelines_share_ids_across_call_paths() {
    let config = test_config();
    let direct = config.processor("half", "sRGB").unwrap();
    let via_transform = config
        .transform_processor(
            None,
            &Transform::ColorSpace(ColorSpaceTransform {
                src: "half".to_string(),
                dst: "sRGB".to_string(),
                direction: TransformDirection::Forward,
            }),
            TransformDirection::Forward,
        )
        .unwrap();
    assert_eq!(direct.cache_id(), via_transform.cache_id());
}

#[test]
fn config_cache_id_tracks_referenced_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("luts")).unwrap();
    let lut = dir.path().join("luts/ramp.spi1d");
    std::fs::write(&lut, "Version 1\nFrom 0.0 1.0\nLength 2\nComponents 1\n{\n0.0\n1.0\n}\n")
        .unwrap();

    let mut config = test_config();
    config.set_working_dir(dir.path());
    config.add_search_path("luts");
    config
        .add_colorspace(ColorSpace::new("graded").to_reference(Transform::file("ramp.spi1d")))
        .unwrap();

    let ctx = Context::new();
    let before = config.cache_id(Some(&ctx)).unwrap();
    assert_eq!(config.cache_id(Some(&ctx)).unwrap(), before);
    let structural = config.cache_id(None).unwrap();

    // Same length, new mtime.
    std::fs::write(&lut, "Version 1\nFrom 0.0 1.0\nLength 2\nComponents 1\n{\n0.5\n1.0\n}\n")
        .unwrap();
    assert_ne!(config.cache_id(Some(&ctx)).unwrap(), before);
    // Without a context the ID is structural only and ignores files.
    assert_eq!(config.cache_id(None).unwrap(), structural);
}

#[test]
fn file_rule_resolution_order() {
    let mut config = Config::new();
    for name in ["cs1", "cs2", "cs3", "default"] {
        config.add_colorspace(ColorSpace::new(name)).unwrap();
    }
    config.roles_mut().define("reference", "default");
    let rules = config.file_rules_mut();
    rules.set_default_colorspace("default");
    rules.insert(0, FileRule::glob("A", "cs1", "*", "jpg")).unwrap();
    rules.insert(1, FileRule::glob("B", "cs2", "*", "png")).unwrap();
    rules.insert(2, FileRule::glob("C", "cs3", "*", "exr")).unwrap();

    assert_eq!(config.colorspace_from_filepath("test.png"), ("cs2", 1));
    assert_eq!(config.colorspace_from_filepath("pic.txt"), ("default", 3));
}

fn dynamic_exposure_transform() -> Transform {
    Transform::ExposureContrast(ExposureContrastTransform {
        dynamic_exposure: true,
        ..Default::default()
    })
}

fn compile_dynamic(config: &Config) -> Processor {
    config
        .transform_processor(
            None,
            &dynamic_exposure_transform(),
            TransformDirection::Forward,
        )
        .unwrap()
}

#[test]
fn dynamic_properties_are_isolated_per_processor() {
    let config = test_config();
    let a = compile_dynamic(&config);
    let b = compile_dynamic(&config);

    a.dynamic_property(DynamicKind::Exposure)
        .unwrap()
        .set_scalar(2.0)
        .unwrap();

    let mut pa = [0.25_f32, 0.25, 0.25];
    let mut pb = pa;
    a.default_cpu().apply_rgb(&mut pa);
    b.default_cpu().apply_rgb(&mut pb);

    assert!((pa[0] - 1.0).abs() < 1e-5, "exposure +2 stops, got {pa:?}");
    assert!((pb[0] - 0.25).abs() < 1e-5, "b must be unaffected, got {pb:?}");
}

#[test]
fn gpu_shader_id_ignores_dynamic_values() {
    let config = test_config();
    let p = compile_dynamic(&config);

    let first = p.extract_gpu_shader_info(GpuShaderSettings::default()).unwrap();
    p.dynamic_property(DynamicKind::Exposure)
        .unwrap()
        .set_scalar(3.0)
        .unwrap();
    let second = p.extract_gpu_shader_info(GpuShaderSettings::default()).unwrap();

    assert_eq!(first.cache_id(), second.cache_id());
    assert_eq!(second.uniforms.len(), 1);
    assert!((second.uniforms[0].value().unwrap() - 3.0).abs() < 1e-12);
}

#[test]
fn processor_cache_hits_until_config_changes() {
    let cache = ProcessorCache::new();
    let mut config = test_config();

    let a = cache
        .colorspace_processor(&config, None, "half", "sRGB")
        .unwrap();
    let b = cache
        .colorspace_processor(&config, None, "half", "sRGB")
        .unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(a.cache_id(), b.cache_id());

    config
        .add_colorspace(ColorSpace::new("extra").to_reference(scale(4.0)))
        .unwrap();
    cache
        .colorspace_processor(&config, None, "half", "sRGB")
        .unwrap();
    assert_eq!(cache.len(), 2);
}

#[test]
fn display_pipeline_falls_back_past_missing_look() {
    let mut config = test_config();
    config
        .add_look(Look::new("grade").process_space("linear").transform(scale(0.5)))
        .unwrap();
    config
        .add_display(
            Display::new("monitor").view(View::new("Film", "sRGB").looks("missing | grade")),
        )
        .unwrap();

    let p = config.display_processor("half", "monitor", "Film").unwrap();
    let cpu = p.default_cpu();

    // half -> reference doubles, the surviving look halves, sRGB encodes.
    let mut px = [0.09_f32, 0.09, 0.09];
    cpu.apply_rgb(&mut px);
    let reference = config.display_processor("linear", "monitor", "Film").unwrap();
    let mut expected = [0.18_f32, 0.18, 0.18];
    reference.default_cpu().apply_rgb(&mut expected);
    // The look halves both paths identically, so results must agree.
    for (a, b) in px.iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn named_transform_round_trip() {
    let mut config = test_config();
    config
        .add_named_transform(
            chroma_core::NamedTransform::new("utility_gain").forward(scale(2.0)),
        )
        .unwrap();

    let fwd = config
        .named_transform_processor(None, "utility_gain", TransformDirection::Forward)
        .unwrap()
        .default_cpu();
    let rev = config
        .named_transform_processor(None, "utility_gain", TransformDirection::Inverse)
        .unwrap()
        .default_cpu();

    let mut px = [0.2_f32, 0.4, 0.6];
    fwd.apply_rgb(&mut px);
    assert!((px[0] - 0.4).abs() < 1e-6);
    rev.apply_rgb(&mut px);
    assert!((px[0] - 0.2).abs() < 1e-6);
}

#[test]
fn context_selects_distinct_processors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sh010")).unwrap();
    std::fs::create_dir_all(dir.path().join("sh020")).unwrap();
    let ramp = "Version 1\nFrom 0.0 1.0\nLength 2\nComponents 1\n{\n0.0\n1.0\n}\n";
    let boost = "Version 1\nFrom 0.0 1.0\nLength 2\nComponents 1\n{\n0.0\n2.0\n}\n";
    std::fs::write(dir.path().join("sh010/grade.spi1d"), ramp).unwrap();
    std::fs::write(dir.path().join("sh020/grade.spi1d"), boost).unwrap();

    let mut config = Config::new();
    config.set_working_dir(dir.path());
    config.add_colorspace(ColorSpace::new("linear")).unwrap();
    config
        .add_colorspace(
            ColorSpace::new("shot_grade").to_reference(Transform::file("$SHOT/grade.spi1d")),
        )
        .unwrap();
    config.roles_mut().define("reference", "linear");

    let mut ctx = Context::new();
    ctx.set("SHOT", "sh010");
    let identity = config
        .processor_with_context(Some(&ctx), "shot_grade", "linear")
        .unwrap();
    ctx.set("SHOT", "sh020");
    let doubled = config
        .processor_with_context(Some(&ctx), "shot_grade", "linear")
        .unwrap();

    assert_ne!(identity.cache_id(), doubled.cache_id());
    let mut px = [1.0_f32, 1.0, 1.0];
    doubled.default_cpu().apply_rgb(&mut px);
    assert!((px[0] - 2.0).abs() < 1e-5);
}
