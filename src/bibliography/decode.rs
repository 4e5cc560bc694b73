//! Decoding of LaTeX escapes found in bibliographic text.
//!
//! Each stage handles one family of escapes. [`decode`] runs them all in order
//! on the text outside `$...$` spans, leaving math untouched.

/// Run every decoding stage on the text outside inline math.
pub fn decode(text: &str) -> String {
    map_outside_math(text, |chunk| {
        let text = normalize(chunk);
        let text = accents(&text);
        let text = diacritics(&text);
        let text = punctuation(&text);
        let text = symbols(&text);
        greek(&text)
    })
}

/// Apply `f` to the parts of `text` outside `$` delimited spans.
pub fn map_outside_math(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, chunk) in text.split('$').enumerate() {
        if i > 0 {
            out.push('$');
        }
        if i % 2 == 0 {
            out.push_str(&f(chunk));
        } else {
            out.push_str(chunk);
        }
    }
    out
}

const ACCENTS: &[char] = &['`', '\'', '^', '"', '~', '=', '.'];
const LETTER_ACCENTS: &[char] = &['c', 'v', 'u', 'H', 'k', 'r'];

/// Bring accent commands into the canonical `\"{o}` form.
///
/// Accepts `{\"o}`, `\"o`, `\" o`, `{\c c}` and `\c c`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['{', '\\']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(inner) = tail.strip_prefix("{\\") {
            if let Some((command, consumed)) = accent_command(inner) {
                if inner[consumed..].starts_with('}') {
                    out.push_str(&command);
                    rest = &inner[consumed + 1..];
                    continue;
                }
            }
        } else if let Some(inner) = tail.strip_prefix('\\') {
            if let Some((command, consumed)) = accent_command(inner) {
                out.push_str(&command);
                rest = &inner[consumed..];
                continue;
            }
        }

        let c = tail.chars().next().map_or(1, char::len_utf8);
        out.push_str(&tail[..c]);
        rest = &tail[c..];
    }

    out.push_str(rest);
    out
}

/// Recognize an accent command body (after the backslash) and return it in
/// canonical form with the number of bytes consumed.
fn accent_command(input: &str) -> Option<(String, usize)> {
    let mut chars = input.char_indices();
    let (_, accent) = chars.next()?;
    let is_symbol = ACCENTS.contains(&accent);
    let is_letter = LETTER_ACCENTS.contains(&accent);
    if !is_symbol && !is_letter {
        return None;
    }

    let after = &input[accent.len_utf8()..];
    // Letter accents need a separator so that `\ce` or `\cite` are left alone
    let (after, skipped) = if is_letter {
        if after.starts_with('{') {
            (after, 0)
        } else {
            let trimmed = after.strip_prefix(' ')?;
            (trimmed, 1)
        }
    } else {
        let trimmed = after.trim_start_matches(' ');
        (trimmed, after.len() - trimmed.len())
    };

    let offset = accent.len_utf8() + skipped;
    if let Some(braced) = after.strip_prefix('{') {
        let close = braced.find('}')?;
        let base = &braced[..close];
        return Some((format!("\\{accent}{{{base}}}"), offset + close + 2));
    }

    let base = after.chars().next().filter(|c| c.is_alphabetic())?;
    Some((format!("\\{accent}{{{base}}}"), offset + base.len_utf8()))
}

fn combining_mark(accent: char) -> Option<char> {
    Some(match accent {
        '`' => '\u{300}',
        '\'' => '\u{301}',
        '^' => '\u{302}',
        '~' => '\u{303}',
        '=' => '\u{304}',
        'u' => '\u{306}',
        '.' => '\u{307}',
        '"' => '\u{308}',
        'r' => '\u{30a}',
        'H' => '\u{30b}',
        'v' => '\u{30c}',
        'c' => '\u{327}',
        'k' => '\u{328}',
        _ => return None,
    })
}

/// Precomposed forms of the common accented Latin letters.
const PRECOMPOSED: &[(char, char, char)] = &[
    ('a', '`', 'à'), ('a', '\'', 'á'), ('a', '^', 'â'), ('a', '~', 'ã'), ('a', '"', 'ä'), ('a', 'r', 'å'),
    ('a', '=', 'ā'), ('a', 'u', 'ă'), ('a', 'k', 'ą'),
    ('A', '`', 'À'), ('A', '\'', 'Á'), ('A', '^', 'Â'), ('A', '~', 'Ã'), ('A', '"', 'Ä'), ('A', 'r', 'Å'),
    ('c', '\'', 'ć'), ('c', 'c', 'ç'), ('c', 'v', 'č'), ('C', '\'', 'Ć'), ('C', 'c', 'Ç'), ('C', 'v', 'Č'),
    ('d', 'v', 'ď'), ('D', 'v', 'Ď'),
    ('e', '`', 'è'), ('e', '\'', 'é'), ('e', '^', 'ê'), ('e', '"', 'ë'), ('e', '=', 'ē'), ('e', 'v', 'ě'),
    ('e', 'k', 'ę'), ('e', '.', 'ė'),
    ('E', '`', 'È'), ('E', '\'', 'É'), ('E', '^', 'Ê'), ('E', '"', 'Ë'),
    ('g', 'u', 'ğ'), ('G', 'u', 'Ğ'),
    ('i', '`', 'ì'), ('i', '\'', 'í'), ('i', '^', 'î'), ('i', '"', 'ï'), ('i', '=', 'ī'),
    ('I', '`', 'Ì'), ('I', '\'', 'Í'), ('I', '^', 'Î'), ('I', '"', 'Ï'), ('I', '.', 'İ'),
    ('n', '~', 'ñ'), ('n', '\'', 'ń'), ('n', 'v', 'ň'), ('N', '~', 'Ñ'), ('N', '\'', 'Ń'),
    ('o', '`', 'ò'), ('o', '\'', 'ó'), ('o', '^', 'ô'), ('o', '~', 'õ'), ('o', '"', 'ö'), ('o', 'H', 'ő'),
    ('o', '=', 'ō'),
    ('O', '`', 'Ò'), ('O', '\'', 'Ó'), ('O', '^', 'Ô'), ('O', '~', 'Õ'), ('O', '"', 'Ö'), ('O', 'H', 'Ő'),
    ('r', 'v', 'ř'), ('R', 'v', 'Ř'),
    ('s', '\'', 'ś'), ('s', 'v', 'š'), ('s', 'c', 'ş'), ('S', '\'', 'Ś'), ('S', 'v', 'Š'), ('S', 'c', 'Ş'),
    ('t', 'v', 'ť'), ('T', 'v', 'Ť'),
    ('u', '`', 'ù'), ('u', '\'', 'ú'), ('u', '^', 'û'), ('u', '"', 'ü'), ('u', 'H', 'ű'), ('u', 'r', 'ů'),
    ('u', '=', 'ū'),
    ('U', '`', 'Ù'), ('U', '\'', 'Ú'), ('U', '^', 'Û'), ('U', '"', 'Ü'), ('U', 'H', 'Ű'), ('U', 'r', 'Ů'),
    ('y', '\'', 'ý'), ('y', '"', 'ÿ'), ('Y', '\'', 'Ý'),
    ('z', '\'', 'ź'), ('z', '.', 'ż'), ('z', 'v', 'ž'), ('Z', '\'', 'Ź'), ('Z', '.', 'Ż'), ('Z', 'v', 'Ž'),
];

fn compose(base: &str, accent: char) -> Option<String> {
    let base = match base {
        "\\i" | "i" => 'i',
        "\\j" | "j" => 'j',
        other => {
            let mut chars = other.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            c
        }
    };

    if let Some(&(_, _, composed)) = PRECOMPOSED
        .iter()
        .find(|&&(b, a, _)| b == base && a == accent)
    {
        return Some(composed.to_string());
    }
    combining_mark(accent).map(|mark| format!("{base}{mark}"))
}

/// Replace canonical accent commands with accented letters.
fn replace_accents(text: &str, accents: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        let replaced = tail.chars().next().and_then(|accent| {
            if !accents.contains(&accent) {
                return None;
            }
            let braced = tail[accent.len_utf8()..].strip_prefix('{')?;
            let close = braced.find('}')?;
            let letter = compose(&braced[..close], accent)?;
            Some((letter, accent.len_utf8() + close + 2))
        });

        match replaced {
            Some((letter, consumed)) => {
                out.push_str(&letter);
                rest = &tail[consumed..];
            }
            None => {
                out.push('\\');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode symbol accents such as `\"{o}` or `\'{e}`.
pub fn accents(text: &str) -> String {
    replace_accents(text, ACCENTS)
}

/// Decode letter accents such as `\c{c}` or `\v{s}`, and special letters
/// such as `\o` or `\ss`.
pub fn diacritics(text: &str) -> String {
    let text = replace_accents(text, LETTER_ACCENTS);
    replace_control_words(&text, |name| {
        Some(match name {
            "o" => "ø",
            "O" => "Ø",
            "aa" => "å",
            "AA" => "Å",
            "ae" => "æ",
            "AE" => "Æ",
            "oe" => "œ",
            "OE" => "Œ",
            "ss" => "ß",
            "l" => "ł",
            "L" => "Ł",
            "i" => "ı",
            "j" => "ȷ",
            _ => return None,
        })
    })
}

/// Decode dashes, quotes and escaped punctuation.
pub fn punctuation(text: &str) -> String {
    let text = text
        .replace("---", "—")
        .replace("--", "–")
        .replace("``", "“")
        .replace("''", "”")
        .replace("\\&", "&")
        .replace("\\%", "%")
        .replace("\\#", "#")
        .replace("\\_", "_");
    replace_control_words(&text, |name| {
        Some(match name {
            "textendash" => "–",
            "textemdash" => "—",
            "textquoteleft" => "‘",
            "textquoteright" => "’",
            "textquotedblleft" => "“",
            "textquotedblright" => "”",
            "guillemotleft" => "«",
            "guillemotright" => "»",
            _ => return None,
        })
    })
}

/// Decode text symbols such as `\S` or `\textregistered`.
pub fn symbols(text: &str) -> String {
    replace_control_words(text, |name| {
        Some(match name {
            "textregistered" => "®",
            "texttrademark" => "™",
            "copyright" | "textcopyright" => "©",
            "dag" | "textdagger" => "†",
            "ddag" | "textdaggerdbl" => "‡",
            "S" | "textsection" => "§",
            "P" | "textparagraph" => "¶",
            "pounds" | "textsterling" => "£",
            "euro" | "texteuro" => "€",
            "ldots" | "dots" | "textellipsis" => "…",
            "textdegree" => "°",
            _ => return None,
        })
    })
}

/// Decode Greek letter commands used outside math.
pub fn greek(text: &str) -> String {
    replace_control_words(text, |name| {
        Some(match name {
            "alpha" => "α",
            "beta" => "β",
            "gamma" => "γ",
            "delta" => "δ",
            "epsilon" | "varepsilon" => "ε",
            "zeta" => "ζ",
            "eta" => "η",
            "theta" | "vartheta" => "θ",
            "iota" => "ι",
            "kappa" => "κ",
            "lambda" => "λ",
            "mu" => "μ",
            "nu" => "ν",
            "xi" => "ξ",
            "pi" => "π",
            "rho" => "ρ",
            "sigma" => "σ",
            "varsigma" => "ς",
            "tau" => "τ",
            "upsilon" => "υ",
            "phi" | "varphi" => "φ",
            "chi" => "χ",
            "psi" => "ψ",
            "omega" => "ω",
            "Gamma" => "Γ",
            "Delta" => "Δ",
            "Theta" => "Θ",
            "Lambda" => "Λ",
            "Xi" => "Ξ",
            "Pi" => "Π",
            "Sigma" => "Σ",
            "Upsilon" => "Υ",
            "Phi" => "Φ",
            "Psi" => "Ψ",
            "Omega" => "Ω",
            _ => return None,
        })
    })
}

/// Replace `\name` (and a following `{}`) when `lookup` knows the name.
fn replace_control_words(text: &str, lookup: impl Fn(&str) -> Option<&'static str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let name_len = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let name = &tail[..name_len];

        match lookup(name).filter(|_| !name.is_empty()) {
            Some(replacement) => {
                out.push_str(replacement);
                let after = &tail[name_len..];
                rest = after
                    .strip_prefix("{}")
                    .or_else(|| after.strip_prefix(' ').filter(|s| s.starts_with(char::is_alphabetic)))
                    .unwrap_or(after);
            }
            None => {
                out.push('\\');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
