//! # Token Anotado com Sentido
//!
//! O token é a unidade que o sistema recebe do tokenizador/etiquetador
//! externo (um colaborador fora deste crate). Cada token carrega o texto
//! original e a etiqueta gramatical Penn (`NN`, `NNS`, `VB`, ...); a
//! desambiguação escreve de volta o campo `synid` com o deslocamento do
//! sentido escolhido.
//!
//! | Campo   | Direção | Significado                                    |
//! |---------|---------|------------------------------------------------|
//! | `text`  | entrada | texto do token como veio do tokenizador        |
//! | `tag`   | entrada | etiqueta gramatical Penn                       |
//! | `synid` | saída   | deslocamento do sentido (synset), se resolvido |

use serde::{Deserialize, Serialize};

/// Um token produzido pelo etiquetador externo.
///
/// `text` e `tag` são somente leitura para este sistema; `synid` começa
/// como `None` e só é preenchido pela desambiguação. O valor `Some(-1)` é
/// o recuo defensivo para uma palavra sem lista de candidatos — distinto
/// de `None` (token jamais tocado).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Texto do token (ex: "bank", "River", ",").
    pub text: String,
    /// Etiqueta gramatical Penn (ex: "NN", "NNS", "VBD").
    pub tag: String,
    /// Deslocamento do sentido atribuído pela desambiguação.
    pub synid: Option<i32>,
}

impl Token {
    /// Cria um token com texto e etiqueta, ainda sem sentido atribuído.
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: tag.into(),
            synid: None,
        }
    }

    /// Retorna `true` se o token é puramente textual (sem dígitos nem
    /// pontuação numérica como `.` ou `,`).
    pub fn is_text(&self) -> bool {
        !self
            .text
            .chars()
            .any(|ch| ch.is_ascii_digit() || ch == '.' || ch == ',')
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_has_no_synid() {
        let token = Token::new("bank", "NN");
        assert_eq!(token.text, "bank");
        assert_eq!(token.tag, "NN");
        assert_eq!(token.synid, None);
    }

    #[test]
    fn test_is_text() {
        assert!(Token::new("river", "NN").is_text());
        assert!(!Token::new("3.14", "CD").is_text());
        assert!(!Token::new("1,000", "CD").is_text());
    }
}
