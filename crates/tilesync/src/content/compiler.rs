use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::info;

use super::database::{AbilityDef, ActorDef, DefDatabase};
use super::types::{AbilityId, ActorKind};

pub const MAX_ABILITY_SLOTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
    MissingDef,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

#[derive(Debug)]
enum ParsedDef {
    Actor(ActorDef),
    Ability(AbilityDef),
}

/// Reads every `*.xml` under `content_dir` (sorted by relative path) into a
/// complete database. Every actor kind and ability must be defined exactly once.
pub fn compile_def_database(content_dir: &Path) -> Result<DefDatabase, ContentCompileError> {
    let xml_files = collect_xml_files_sorted(content_dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut actors = BTreeMap::<ActorKind, ActorDef>::new();
    let mut abilities = BTreeMap::<AbilityId, AbilityDef>::new();

    for xml_file in &xml_files {
        let raw = fs::read_to_string(xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        for def in parse_defs_document(xml_file, &raw)? {
            match def {
                ParsedDef::Actor(def) => {
                    let kind = def.kind;
                    if actors.insert(kind, def).is_some() {
                        return Err(duplicate_def_error(xml_file, "ActorDef", kind.token()));
                    }
                }
                ParsedDef::Ability(def) => {
                    let id = def.id;
                    if abilities.insert(id, def).is_some() {
                        return Err(duplicate_def_error(xml_file, "AbilityDef", id.token()));
                    }
                }
            }
        }
    }

    let database = DefDatabase::from_defs(actors.into_values(), abilities.into_values());
    let missing_actors = database.missing_actor_kinds();
    let missing_abilities = database.missing_abilities();
    if !missing_actors.is_empty() || !missing_abilities.is_empty() {
        return Err(ContentCompileError {
            code: ContentErrorCode::MissingDef,
            message: format!(
                "content is incomplete; missing ActorDef for [{}], missing AbilityDef for [{}]",
                join_tokens(missing_actors.iter().map(|kind| kind.token())),
                join_tokens(missing_abilities.iter().map(|id| id.token())),
            ),
            file_path: content_dir.to_path_buf(),
            location: None,
        });
    }

    info!(
        files = xml_files.len(),
        actor_defs = database.actor_defs().count(),
        ability_defs = database.ability_defs().count(),
        "content_loaded"
    );
    Ok(database)
}

fn parse_defs_document(file_path: &Path, raw: &str) -> Result<Vec<ParsedDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut defs = Vec::<ParsedDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        let def = match child.tag_name().name() {
            "ActorDef" => ParsedDef::Actor(parse_actor_def(file_path, &doc, child)?),
            "AbilityDef" => ParsedDef::Ability(parse_ability_def(file_path, &doc, child)?),
            other => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownDefType,
                    format!("unsupported def type <{other}>; expected <ActorDef> or <AbilityDef>"),
                    file_path,
                    &doc,
                    child,
                ))
            }
        };
        defs.push(def);
    }

    Ok(defs)
}

fn parse_actor_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<ActorDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut kind: Option<ActorKind> = None;
    let mut speed: Option<f32> = None;
    let mut melee_range: Option<u32> = None;
    let mut abilities = Vec::<AbilityId>::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <ActorDef>"),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "kind" => {
                let value = required_text(file_path, doc, field, "kind")?;
                kind = Some(ActorKind::from_token(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("unknown actor kind '{value}'"),
                        file_path,
                        doc,
                        field,
                    )
                })?);
            }
            "speedTilesPerSecond" => {
                let parsed: f32 = parse_number(file_path, doc, field, "speedTilesPerSecond")?;
                if !parsed.is_finite() || parsed < 0.0 {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "speedTilesPerSecond must be finite and >= 0".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                speed = Some(parsed);
            }
            "meleeRange" => {
                melee_range = Some(parse_number(file_path, doc, field, "meleeRange")?);
            }
            "abilities" => {
                abilities = parse_ability_list(file_path, doc, field)?;
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <ActorDef>"),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(kind) = kind else {
        return Err(missing_field(file_path, doc, node, "kind", "ActorDef"));
    };
    let Some(speed_tiles_per_second) = speed else {
        return Err(missing_field(file_path, doc, node, "speedTilesPerSecond", "ActorDef"));
    };

    Ok(ActorDef {
        kind,
        speed_tiles_per_second,
        melee_range: melee_range.unwrap_or(1),
        abilities,
    })
}

fn parse_ability_list(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Vec<AbilityId>, ContentCompileError> {
    let mut abilities = Vec::<AbilityId>::new();
    for item in node.children().filter(|child| child.is_element()) {
        if item.tag_name().name() != "li" {
            return Err(error_at_node(
                ContentErrorCode::UnknownField,
                format!("unexpected <{}> in <abilities>; use <li>", item.tag_name().name()),
                file_path,
                doc,
                item,
            ));
        }
        let value = required_text(file_path, doc, item, "li")?;
        let Some(id) = AbilityId::from_token(&value) else {
            return Err(error_at_node(
                ContentErrorCode::InvalidValue,
                format!("unknown ability '{value}'"),
                file_path,
                doc,
                item,
            ));
        };
        if abilities.contains(&id) {
            return Err(error_at_node(
                ContentErrorCode::InvalidValue,
                format!("ability '{value}' listed twice"),
                file_path,
                doc,
                item,
            ));
        }
        abilities.push(id);
    }

    if abilities.len() > MAX_ABILITY_SLOTS {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "{} abilities listed; at most {MAX_ABILITY_SLOTS} slots are available",
                abilities.len()
            ),
            file_path,
            doc,
            node,
        ));
    }
    Ok(abilities)
}

fn parse_ability_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<AbilityDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut id: Option<AbilityId> = None;
    let mut range_tiles: Option<u32> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <AbilityDef>"),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "id" => {
                let value = required_text(file_path, doc, field, "id")?;
                id = Some(AbilityId::from_token(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("unknown ability '{value}'"),
                        file_path,
                        doc,
                        field,
                    )
                })?);
            }
            "rangeTiles" => {
                range_tiles = Some(parse_number(file_path, doc, field, "rangeTiles")?);
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <AbilityDef>"),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(id) = id else {
        return Err(missing_field(file_path, doc, node, "id", "AbilityDef"));
    };

    Ok(AbilityDef {
        id,
        range_tiles: range_tiles.unwrap_or(0),
    })
}

fn parse_number<T: FromStr>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<T, ContentCompileError> {
    let value = required_text(file_path, doc, node, field_name)?;
    value.parse::<T>().map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{field_name} '{value}' is not a valid number"),
            file_path,
            doc,
            node,
        )
    })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn missing_field(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
    def_type: &str,
) -> ContentCompileError {
    error_at_node(
        ContentErrorCode::MissingField,
        format!("missing required field <{field_name}> in <{def_type}>"),
        file_path,
        doc,
        node,
    )
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

fn duplicate_def_error(file_path: &Path, def_type: &str, key: &str) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::DuplicateDef,
        message: format!("duplicate {def_type} '{key}'; each key may be defined only once"),
        file_path: file_path.to_path_buf(),
        location: None,
    }
}

fn join_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(", ")
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_cached_key(|path| {
        normalize_rel_path(path.strip_prefix(root).unwrap_or(path.as_path()))
    });
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content: {source}"),
        file_path: path,
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::content::ActorStatsResolver;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn shipped_content_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("assets")
            .join("base")
    }

    /// Minimal complete content set: every kind and ability defined once.
    fn complete_defs_xml() -> String {
        let mut xml = String::from("<Defs>\n");
        for kind in ActorKind::ALL {
            xml.push_str(&format!(
                "<ActorDef><kind>{}</kind><speedTilesPerSecond>6</speedTilesPerSecond></ActorDef>\n",
                kind.token()
            ));
        }
        for ability in AbilityId::ALL {
            xml.push_str(&format!("<AbilityDef><id>{}</id></AbilityDef>\n", ability.token()));
        }
        xml.push_str("</Defs>");
        xml
    }

    #[test]
    fn shipped_content_compiles_and_is_complete() {
        let db = compile_def_database(&shipped_content_dir()).expect("compile");
        let ranger = db.actor_def(ActorKind::Ranger).expect("ranger");
        assert_eq!(ranger.melee_range, 5);
        assert!((ranger.speed_tiles_per_second - 7.0).abs() < f32::EPSILON);
        let rogue = db.actor_def(ActorKind::Rogue).expect("rogue");
        assert!((rogue.speed_tiles_per_second - 8.0).abs() < f32::EPSILON);
        assert!(db
            .ability_def(AbilityId::Fireball)
            .is_some_and(|def| def.range_tiles > 0));
        assert_eq!(
            db.ability_def(AbilityId::WarCry).map(|def| def.range_tiles),
            Some(0)
        );
    }

    #[test]
    fn defaults_apply_for_optional_fields() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("defs.xml"), &complete_defs_xml());
        let db = compile_def_database(temp.path()).expect("compile");
        let orc = db.actor_def(ActorKind::Orc).expect("orc");
        assert_eq!(orc.melee_range, 1);
        assert!(orc.abilities.is_empty());
        assert_eq!(
            db.ability_def(AbilityId::Heal).map(|def| def.range_tiles),
            Some(0)
        );
    }

    #[test]
    fn incomplete_content_reports_missing_defs() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><ActorDef><kind>orc</kind><speedTilesPerSecond>5</speedTilesPerSecond></ActorDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("incomplete");
        assert_eq!(err.code, ContentErrorCode::MissingDef);
        assert!(err.message.contains("warrior"));
        assert!(err.message.contains("fireball"));
    }

    #[test]
    fn defs_split_across_files_merge() {
        let temp = TempDir::new().expect("temp");
        let complete = complete_defs_xml();
        let (actors, abilities): (Vec<&str>, Vec<&str>) = complete
            .lines()
            .filter(|line| line.starts_with("<ActorDef") || line.starts_with("<AbilityDef"))
            .partition(|line| line.starts_with("<ActorDef"));
        write_file(
            &temp.path().join("actors.xml"),
            &format!("<Defs>{}</Defs>", actors.concat()),
        );
        write_file(
            &temp.path().join("nested").join("abilities.xml"),
            &format!("<Defs>{}</Defs>", abilities.concat()),
        );
        compile_def_database(temp.path()).expect("compile");
    }

    #[test]
    fn duplicate_def_across_files_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("a.xml"), &complete_defs_xml());
        write_file(
            &temp.path().join("b.xml"),
            r#"<Defs><AbilityDef><id>heal</id><rangeTiles>3</rangeTiles></AbilityDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("duplicate");
        assert_eq!(err.code, ContentErrorCode::DuplicateDef);
        assert!(err.file_path.ends_with("b.xml"));
    }

    #[test]
    fn unknown_kind_reports_location() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            "<Defs>\n  <ActorDef><kind>dragon</kind><speedTilesPerSecond>9</speedTilesPerSecond></ActorDef>\n</Defs>",
        );
        let err = compile_def_database(temp.path()).expect_err("unknown kind");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
        assert_eq!(err.location.map(|loc| loc.line), Some(2));
    }

    #[test]
    fn unknown_field_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><ActorDef><kind>orc</kind><speedTilesPerSecond>5</speedTilesPerSecond><mood>angry</mood></ActorDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn duplicate_field_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><AbilityDef><id>heal</id><rangeTiles>1</rangeTiles><rangeTiles>2</rangeTiles></AbilityDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn missing_speed_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><ActorDef><kind>orc</kind></ActorDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.location.is_some());
    }

    #[test]
    fn negative_speed_is_invalid() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><ActorDef><kind>orc</kind><speedTilesPerSecond>-2</speedTilesPerSecond></ActorDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn too_many_abilities_is_invalid() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><ActorDef><kind>mage</kind><speedTilesPerSecond>7</speedTilesPerSecond><abilities>
                <li>fireball</li><li>ice_bolt</li><li>thunderstorm</li><li>mana_shield</li>
                <li>frost_nova</li><li>arcane_surge</li><li>heal</li>
            </abilities></ActorDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn wrong_root_and_def_type_error() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("defs.xml"), "<Things></Things>");
        let err = compile_def_database(temp.path()).expect_err("root");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);

        write_file(&temp.path().join("defs.xml"), "<Defs><ItemDef/></Defs>");
        let err = compile_def_database(temp.path()).expect_err("def type");
        assert_eq!(err.code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("defs.xml"),
            r#"<Defs><ActorDef><kind>orc</kind></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn missing_directory_is_read_error() {
        let temp = TempDir::new().expect("temp");
        let err = compile_def_database(&temp.path().join("absent")).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::ReadFile);
    }
}
