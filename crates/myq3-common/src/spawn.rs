// spawn.rs — Entity lump parsing and player spawn point lookup

use crate::common::com_printf;
use crate::q_shared::{com_parse, Vec3};

/// Key/value pairs of one `{ ... }` entity block, in file order.
pub type EntityFields = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub origin: Vec3,
    pub yaw: f32,
}

/// Parse a space-separated "x y z" string into [f32; 3].
fn parse_vec3(s: &str) -> Vec3 {
    let mut vec = [0.0f32; 3];
    for (slot, part) in vec.iter_mut().zip(s.split_whitespace()) {
        *slot = part.parse().unwrap_or(0.0);
    }
    vec
}

/// Parse the key/value pairs after an opening brace. Returns the fields and
/// whatever follows the closing brace.
fn parse_entity(data: &str) -> Result<(EntityFields, Option<&str>), String> {
    let mut fields = Vec::new();
    let mut remaining = data;

    loop {
        // parse key
        let (keyname, rest) = com_parse(remaining);
        if keyname == "}" {
            return Ok((fields, rest));
        }
        let rest = rest.ok_or("EOF without closing brace")?;

        // parse value
        let (value, rest) = com_parse(rest);
        if value == "}" {
            return Err("closing brace without data".to_string());
        }
        let rest = rest.ok_or("EOF without closing brace")?;

        // keynames with a leading underscore are utility comments
        if !keyname.starts_with('_') {
            fields.push((keyname, value));
        }
        remaining = rest;
    }
}

/// Split an entity lump into its `{ "key" "value" ... }` blocks.
pub fn parse_entities(data: &str) -> Result<Vec<EntityFields>, String> {
    let mut entities = Vec::new();
    let mut remaining = Some(data);

    while let Some(data) = remaining {
        // parse the opening brace
        let (token, rest) = com_parse(data);
        if token.is_empty() && rest.is_none() {
            break;
        }
        if token != "{" {
            return Err(format!("found {} when expecting {{", token));
        }
        let rest = rest.ok_or("EOF without closing brace")?;

        let (fields, rest) = parse_entity(rest)?;
        entities.push(fields);
        remaining = rest;
    }

    Ok(entities)
}

pub fn value_for_key<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// First deathmatch spawn in the lump, else the first single-player start.
pub fn find_spawn_point(entity_string: &str) -> Option<SpawnPoint> {
    let entities = match parse_entities(entity_string) {
        Ok(entities) => entities,
        Err(e) => {
            com_printf(&format!("WARNING: bad entity string: {}\n", e));
            return None;
        }
    };

    ["info_player_deathmatch", "info_player_start"]
        .iter()
        .find_map(|&classname| {
            entities
                .iter()
                .find(|ent| value_for_key(ent, "classname") == Some(classname))
        })
        .map(|ent| SpawnPoint {
            origin: value_for_key(ent, "origin").map(parse_vec3).unwrap_or([0.0; 3]),
            yaw: value_for_key(ent, "angle")
                .and_then(|a| a.trim().parse().ok())
                .unwrap_or(0.0),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITIES: &str = r#"
{
"classname" "worldspawn"
"message" "Test Arena"
"_color" "1 1 1"
}
{
"classname" "info_player_start"
"origin" "0 0 24"
}
{
"classname" "info_player_deathmatch"
"origin" "128 -64 40"
"angle" "90"
}
{
"classname" "info_player_deathmatch"
"origin" "512 512 0"
}
"#;

    #[test]
    fn test_parse_entities_blocks() {
        let ents = parse_entities(ENTITIES).unwrap();
        assert_eq!(ents.len(), 4);
        assert_eq!(value_for_key(&ents[0], "message"), Some("Test Arena"));
        assert_eq!(value_for_key(&ents[0], "_color"), None, "underscore keys are dropped");
        assert_eq!(value_for_key(&ents[2], "angle"), Some("90"));
    }

    #[test]
    fn test_empty_lump() {
        assert!(parse_entities("").unwrap().is_empty());
        assert!(parse_entities("   \n// nothing here\n").unwrap().is_empty());
        assert_eq!(find_spawn_point(""), None);
    }

    #[test]
    fn test_deathmatch_spawn_preferred() {
        let spawn = find_spawn_point(ENTITIES).unwrap();
        assert_eq!(spawn.origin, [128.0, -64.0, 40.0]);
        assert_eq!(spawn.yaw, 90.0);
    }

    #[test]
    fn test_falls_back_to_player_start() {
        let data = r#"{ "classname" "worldspawn" } { "classname" "info_player_start" "origin" "8 16 32" }"#;
        let spawn = find_spawn_point(data).unwrap();
        assert_eq!(spawn.origin, [8.0, 16.0, 32.0]);
        assert_eq!(spawn.yaw, 0.0);
    }

    #[test]
    fn test_no_spawn_entities() {
        let data = r#"{ "classname" "worldspawn" }"#;
        assert_eq!(find_spawn_point(data), None);
    }

    #[test]
    fn test_malformed_lumps() {
        assert!(parse_entities(r#"{ "classname" "worldspawn""#).is_err());
        assert!(parse_entities(r#"{ "classname" }"#).is_err());
        assert!(parse_entities(r#""classname" "worldspawn""#).is_err());
        assert_eq!(find_spawn_point(r#"{ "classname" "#), None);
    }

    #[test]
    fn test_parse_vec3_partial() {
        assert_eq!(parse_vec3("1 2"), [1.0, 2.0, 0.0]);
        assert_eq!(parse_vec3("x 2 3"), [0.0, 2.0, 3.0]);
    }
}
