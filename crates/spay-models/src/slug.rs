/// Builds a URL-safe slug: lowercase ASCII letters and digits separated by
/// single hyphens. Common Latin accents are folded to their base letter.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    let mut buf = [0u8; 4];

    for c in name.chars().flat_map(char::to_lowercase) {
        let piece: &str = match c {
            'œ' => "oe",
            'æ' => "ae",
            'ß' => "ss",
            _ => {
                let folded = fold_accent(c);
                if folded.is_ascii_alphanumeric() {
                    folded.encode_utf8(&mut buf)
                } else {
                    ""
                }
            }
        };

        if piece.is_empty() {
            pending_dash = true;
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push_str(piece);
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_characters_are_stripped() {
        assert_eq!(slugify("My Shop!!"), "my-shop");
    }

    #[test]
    fn test_slug_is_deterministic() {
        assert_eq!(slugify("My Shop!!"), slugify("My Shop!!"));
        assert_eq!(slugify(&slugify("My Shop!!")), "my-shop");
    }

    #[test]
    fn test_runs_and_edges() {
        assert_eq!(slugify("  --Boutique   Été 2024--  "), "boutique-ete-2024");
        assert_eq!(slugify("Cœur & Co"), "coeur-co");
        assert_eq!(slugify("!!!"), "");
    }
}
