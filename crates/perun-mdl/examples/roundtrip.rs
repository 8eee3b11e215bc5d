use glam::{Quat, Vec2, Vec3};
use perun_common::AssetId;
use perun_mdl::pack::{pack_meshes, MeshSource};
use perun_mdl::{peek, AnimClip, AnimTrack, ModelFile, ModelRoot, SceneNode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Test 1: Pack a two-mesh batch
    println!("=== Test 1: Pack geometry batch ===");
    let quad = MeshSource {
        id: "quad".into(),
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y],
        normals: Some(vec![Vec3::Z; 4]),
        tex_coords: Some(vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y]),
        indices: vec![0, 1, 2, 0, 2, 3],
        ..MeshSource::default()
    };
    let cap = MeshSource {
        id: "cap".into(),
        positions: vec![Vec3::Z, Vec3::X + Vec3::Z, Vec3::Y + Vec3::Z],
        indices: vec![0, 1, 2],
        ..MeshSource::default()
    };

    let packed = pack_meshes(&[quad, cap])?;
    println!(
        "Packed {} meshes: stride {}, {}-bit indices, {} warnings",
        packed.stream.meshes.len(),
        packed.stream.stride,
        packed.stream.index_width * 8,
        packed.warnings.len()
    );
    for warning in &packed.warnings {
        println!("  warning: {:?}", warning);
    }

    // Test 2: Build a model around it and write a container
    println!("\n=== Test 2: Write model container ===");
    let mut root = SceneNode::new("root");
    let mut turret = SceneNode::new("turret");
    turret.translation = Vec3::new(0.0, 1.5, 0.0);
    turret.rotation = Quat::from_rotation_y(0.3);
    root.children.push(turret);

    let model = ModelRoot {
        name: "gun_platform".into(),
        root,
        geometry: packed.stream,
        clips: vec![AnimClip {
            name: "spin".into(),
            duration: 4.0,
            tracks: vec![AnimTrack {
                target: "turret".into(),
                times: vec![0.0, 2.0, 4.0],
                rotations: vec![
                    Quat::IDENTITY,
                    Quat::from_rotation_y(std::f32::consts::PI),
                    Quat::IDENTITY,
                ],
                translations: vec![],
                scales: vec![],
            }],
        }],
    };

    let test_path = "/tmp/test_perun_roundtrip.pmd";
    ModelFile::write_to(test_path, &model, AssetId::generate())?;
    let bytes = std::fs::read(test_path)?;
    println!("Wrote {} bytes to {}", bytes.len(), test_path);

    // Test 3: Read it back
    println!("\n=== Test 3: Read back ===");
    let envelope = peek(&bytes)?;
    println!(
        "Envelope: kind {:?}, struct hash 0x{:08X}, asset {}",
        envelope.kind, envelope.struct_hash, envelope.asset_id
    );

    let file = ModelFile::open(test_path)?;
    println!(
        "Model '{}': {} nodes, {} meshes, {} clips",
        file.model.name,
        file.model.root.subtree_len(),
        file.model.geometry.meshes.len(),
        file.model.clips.len()
    );

    assert_eq!(file.model.name, model.name);
    assert_eq!(file.model.root, model.root);
    assert_eq!(file.model.geometry, model.geometry);
    println!("\nRound-trip OK");

    std::fs::remove_file(test_path)?;
    Ok(())
}
