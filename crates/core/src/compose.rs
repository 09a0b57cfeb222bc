use crate::domain::digest::ScoredCandidate;
use crate::domain::tender::CompanyProfile;
use crate::llm::{ChatPrompt, TextGenerator};
use std::sync::Arc;

const DESCRIPTION_PREFIX_CHARS: usize = 500;
const BID_TEMPERATURE: f32 = 0.7;
const BID_MAX_TOKENS: u32 = 800;
const SUMMARY_MAX_TOKENS: u32 = 200;

const BID_SYSTEM_PROMPT: &str = "Eres un experto consultor en contratación pública ecuatoriana \
con amplia experiencia en SERCOP. Proporcionas análisis claros, profesionales y basados en datos.";

const SUMMARY_SYSTEM_PROMPT: &str =
    "Eres un asesor experto. Respondes de forma concisa y profesional.";

const SUMMARY_FALLBACK: &str = "Estas licitaciones fueron seleccionadas por su alta \
compatibilidad con tu perfil, presupuestos accesibles y bajo nivel de competencia actual.";

/// Qualitative competitiveness tier. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitivenessTier {
    High,
    MediumHigh,
    Medium,
    Low,
}

impl CompetitivenessTier {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.70 {
            Self::High
        } else if probability >= 0.50 {
            Self::MediumHigh
        } else if probability >= 0.30 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "ALTA (muy favorable)",
            Self::MediumHigh => "MEDIA-ALTA (favorable)",
            Self::Medium => "MEDIA (competitiva)",
            Self::Low => "BAJA (muy competitiva)",
        }
    }
}

/// Read-only aggregate handed to the composer: tender, company, bid and the
/// already-computed win probability.
#[derive(Debug, Clone)]
pub struct RecommendationContext {
    pub tender_title: String,
    pub tender_description: String,
    pub main_category: String,
    pub budget_amount: f64,
    pub buyer_name: String,
    pub eligibility_criteria: String,
    pub number_of_tenderers: i64,
    pub company: CompanyProfile,
    pub bid_amount: f64,
    pub probability: f64,
}

/// Produces narrative recommendation text. Every failure of the remote
/// generator degrades to the deterministic fallback; `compose` and
/// `summarize_digest` never return an error.
pub struct RecommendationComposer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl RecommendationComposer {
    /// `None` means credentials were absent at startup: a configuration
    /// state that routes every call straight to the fallback.
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn remote_available(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn compose(&self, ctx: &RecommendationContext) -> String {
        let Some(generator) = &self.generator else {
            return quick_recommendation(ctx.probability, ctx.number_of_tenderers);
        };

        match generator.generate(Self::bid_prompt(ctx)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    provider = generator.provider(),
                    error = %err,
                    "text generation failed; using deterministic fallback"
                );
                let fallback = quick_recommendation(ctx.probability, ctx.number_of_tenderers);
                format!("{fallback}\n\n*Nota: Recomendación generada automáticamente. Error: {err:#}*")
            }
        }
    }

    pub async fn summarize_digest(&self, candidates: &[ScoredCandidate]) -> String {
        let Some(generator) = &self.generator else {
            return SUMMARY_FALLBACK.to_string();
        };

        match generator.generate(Self::digest_prompt(candidates)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    provider = generator.provider(),
                    error = %err,
                    "digest summary generation failed; using fixed fallback"
                );
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    fn bid_prompt(ctx: &RecommendationContext) -> ChatPrompt {
        let tier = CompetitivenessTier::from_probability(ctx.probability);
        let probability_percent = ctx.probability * 100.0;
        let price_delta_percent =
            (ctx.budget_amount - ctx.bid_amount) / ctx.budget_amount * 100.0;
        let description = truncate_chars(&ctx.tender_description, DESCRIPTION_PREFIX_CHARS);

        let user = format!(
            "Eres un experto consultor en contratación pública ecuatoriana. Analiza la siguiente \
licitación y proporciona una recomendación profesional y específica para la empresa participante.\n\
\n\
**LICITACIÓN**\n\
Título: {title}\n\
Descripción: {description}...\n\
Categoría: {category}\n\
Presupuesto referencial: ${budget} USD\n\
Entidad compradora: {buyer}\n\
Criterios de elegibilidad: {eligibility}\n\
Número de participantes: {tenderers}\n\
\n\
**EMPRESA PARTICIPANTE**\n\
Nombre: {company}\n\
Sector: {sector}\n\
Tamaño: {size}\n\
\n\
**OFERTA PRESENTADA**\n\
Monto ofertado: ${bid} USD\n\
Diferencia con presupuesto: {delta:+.1}%\n\
\n\
**ANÁLISIS PREDICTIVO**\n\
Probabilidad de ganar: {prob:.1}%\n\
Nivel de competitividad: {tier}\n\
\n\
---\n\
\n\
Proporciona una recomendación estructurada con los siguientes apartados:\n\
\n\
1. **Análisis de Viabilidad**: Evalúa la alineación entre la licitación y el perfil de la empresa.\n\
2. **Análisis de la Oferta**: Comenta sobre el monto ofertado. ¿Es competitivo?\n\
3. **Fortalezas y Oportunidades**: Identifica aspectos favorables basados en la probabilidad calculada.\n\
4. **Riesgos y Consideraciones**: Señala posibles obstáculos, competencia o riesgos de ejecución.\n\
5. **Recomendación Final**: Conclusión clara (Participar/Reconsiderar/No participar) con 2-3 acciones concretas.\n\
\n\
Sé conciso (máximo 400 palabras), profesional y práctico. Usa datos específicos del análisis.",
            title = ctx.tender_title,
            description = description,
            category = ctx.main_category,
            budget = format_usd(ctx.budget_amount),
            buyer = ctx.buyer_name,
            eligibility = ctx.eligibility_criteria,
            tenderers = ctx.number_of_tenderers,
            company = ctx.company.name,
            sector = ctx.company.sector.as_deref().unwrap_or("No especificado"),
            size = ctx.company.size.as_deref().unwrap_or("No especificado"),
            bid = format_usd(ctx.bid_amount),
            delta = price_delta_percent,
            prob = probability_percent,
            tier = tier.label(),
        );

        ChatPrompt {
            system: BID_SYSTEM_PROMPT.to_string(),
            user,
            temperature: BID_TEMPERATURE,
            max_tokens: BID_MAX_TOKENS,
        }
    }

    fn digest_prompt(candidates: &[ScoredCandidate]) -> ChatPrompt {
        let listing = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "Licitación {n}:\n\
- Título: {title}\n\
- Entidad: {buyer}\n\
- Presupuesto: ${budget}\n\
- Categoría: {category}\n\
- Competidores: {tenderers}",
                    n = i + 1,
                    title = c.tender.title,
                    buyer = c.tender.buyer_name.as_deref().unwrap_or("N/A"),
                    budget = format_usd(c.tender.budget_amount.unwrap_or(0.0)),
                    category = c.tender.main_category.as_deref().unwrap_or("N/A"),
                    tenderers = c.tender.number_of_tenderers.unwrap_or(0),
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let user = format!(
            "Eres un asesor de licitaciones. Analiza estas {count} licitaciones recomendadas \
para una empresa pequeña de tecnología:\n\n{listing}\n\n\
Genera un resumen breve (máximo 3 líneas) explicando POR QUÉ estas licitaciones son las \
mejores opciones HOY.\n\n\
Formato: Un solo párrafo, directo, profesional. NO usar bullets ni listas.",
            count = candidates.len(),
        );

        ChatPrompt {
            system: SUMMARY_SYSTEM_PROMPT.to_string(),
            user,
            temperature: BID_TEMPERATURE,
            max_tokens: SUMMARY_MAX_TOKENS,
        }
    }
}

/// Deterministic tiered fallback. Always embeds the literal probability
/// percentage (one decimal) and the tenderer count.
pub fn quick_recommendation(probability: f64, number_of_tenderers: i64) -> String {
    let percent = probability * 100.0;
    match CompetitivenessTier::from_probability(probability) {
        CompetitivenessTier::High => format!(
            "**Alta probabilidad de ganar** ({percent:.1}%). Oportunidad excelente con \
{number_of_tenderers} competidores. Se recomienda participar."
        ),
        CompetitivenessTier::MediumHigh => format!(
            "**Probabilidad favorable** ({percent:.1}%). Competencia moderada con \
{number_of_tenderers} participantes. Considere participar si cumple requisitos técnicos."
        ),
        CompetitivenessTier::Medium => format!(
            "**Probabilidad media** ({percent:.1}%). Alta competencia con \
{number_of_tenderers} participantes. Evalúe cuidadosamente costos vs. beneficios."
        ),
        CompetitivenessTier::Low => format!(
            "**Baja probabilidad** ({percent:.1}%). Muy competitiva con \
{number_of_tenderers} participantes. Considere otras oportunidades más viables."
        ),
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// `$1,234,567.89`-style formatting for prompt text.
fn format_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped}.{frac:02}")
    } else {
        format!("{grouped}.{frac:02}")
    }
}
