//! # Tipos de Erro do Sistema WSD
//!
//! Define o tipo de erro único do crate ([`WsdError`]) e o alias [`Result`].
//!
//! A taxonomia segue duas categorias bem distintas:
//! - **Erros fatais de configuração**: linha de rótulo malformada, amostra de
//!   treino sem separador, rótulo fora do intervalo do one-hot, contagem de
//!   resultados divergente do classificador. Nenhum deles é recuperável —
//!   propagam até a borda do processo.
//! - **Condições silenciosas por projeto** (que NÃO são erros): palavra fora
//!   do vocabulário na inferência, lista de sentidos truncada em 4, id de
//!   classe duplicado no índice de palavras, lote parcial descartado no fim
//!   do arquivo. Essas nunca aparecem aqui.

use std::path::PathBuf;

/// Alias de `Result` usado em todo o crate.
pub type Result<T, E = WsdError> = std::result::Result<T, E>;

/// Erro único do sistema de desambiguação.
#[derive(Debug, thiserror::Error)]
pub enum WsdError {
    /// Falha de entrada/saída ao ler ou gravar arquivos de corpus,
    /// vocabulário, rótulos ou modelo.
    #[error("falha de E/S: {0}")]
    Io(#[from] std::io::Error),

    /// Linha malformada no arquivo de definição de rótulos.
    ///
    /// Erro fatal de configuração: o arquivo inteiro é rejeitado.
    #[error("linha {line} inválida no arquivo de rótulos: {reason}")]
    MalformedLabel { line: usize, reason: String },

    /// Linha de corpus de treino sem o separador `label:palavras` ou com
    /// rótulo não numérico.
    #[error("amostra de treino inválida: {0}")]
    MalformedSample(String),

    /// Linha malformada no arquivo de vocabulário persistido.
    #[error("linha {line} inválida no arquivo de vocabulário: {content}")]
    MalformedVocab { line: usize, content: String },

    /// Rótulo fora do intervalo `[0, num_classes)` durante a codificação
    /// one-hot. O chamador deve fornecer `num_classes` maior que o maior
    /// rótulo presente no corpus.
    #[error("rótulo {label} fora do intervalo [0, {num_classes})")]
    LabelOutOfRange { label: u32, num_classes: usize },

    /// O classificador devolveu um número de resultados diferente do número
    /// de requisições enviadas. Violação de contrato com o backend de
    /// inferência.
    #[error("classificador devolveu {got} resultados para {expected} requisições")]
    ClassifierContract { expected: usize, got: usize },

    /// Palavra consultada no registro de rótulos sem estar registrada.
    /// Os chamadores devem verificar `is_registered` antes.
    #[error("palavra não registrada no registro de rótulos: {0}")]
    UnknownHeadword(String),

    /// O corpus não contém amostras suficientes para formar um único lote
    /// completo; o fluxo de lotes jamais produziria um resultado.
    #[error("corpus {} não produz nenhum lote completo de {batch_size} amostras", .path.display())]
    CorpusTooSmall { path: PathBuf, batch_size: usize },

    /// Entrada inválida em uma fronteira de API (dimensões divergentes,
    /// vocabulário vazio, modelo ausente).
    #[error("entrada inválida: {0}")]
    InvalidInput(String),

    /// O artefato de modelo carregado não corresponde à arquitetura
    /// reconstruída a partir da sua configuração.
    #[error("artefato de modelo inválido: {0}")]
    InvalidArtifact(String),

    /// Erro do backend de tensores (candle) durante treino ou inferência.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),

    /// Erro de (de)serialização do artefato binário do modelo.
    #[error(transparent)]
    Artifact(#[from] bincode::Error),
}
