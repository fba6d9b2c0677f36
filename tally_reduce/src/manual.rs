/*!

This is the long-form manual for `tally_reduce` and `tallydigest`.

## Input format

The input is a directory of tally files as published by the electoral authority:
one row per candidate per polling aggregation unit, semicolon-delimited, Latin-1
encoded, with a header row. The election year is read from the file name: a file
is processed for every configured year that appears in its name
(`votacao_candidato_munzona_2022_BR.csv` belongs to 2022). Files whose name
contains no configured year are skipped with a warning.

The column names changed over the years. Each canonical field is resolved from
the first alias (in this order) that is present in the header, ignoring case:

| Field        | Aliases                                        |
|--------------|------------------------------------------------|
| votes        | `QT_VOTOS`, `QTD_VOTOS`, `QT_VOTOS_NOMINAIS`   |
| candidate    | `NM_URNA_CANDIDATO`, `NM_CANDIDATO`            |
| party        | `SG_PARTIDO`                                   |
| municipality | `CD_MUNICIPIO`                                 |
| office       | `DS_CARGO`                                     |
| subdivision  | `SG_UF` (only needed for the two-level output) |

A file that does not resolve all the needed fields is skipped entirely. Rows with a
non-integer vote count or missing fields are dropped; the rest of the file is used.

## Offices

Only three offices are aggregated: `PRESIDENT`, `GOVERNOR` and `SENATOR`. The
`DS_CARGO` column may use either these names or the labels used by the source
(`PRESIDENTE`, `GOVERNADOR`, `SENADOR`), in any case. Every other office
(mayors, deputies...) is ignored.

## Output format

One JSON document per year and office, named `{year}_{office}.json`
(`2022_president.json`, `2022_governor.json`, `2022_senator.json`):

```json
{"meta":{"year":2022,"office":"PRESIDENT"},
 "states":{"35":{"CANDIDATE A (PARTY1)":100,"CANDIDATE B (PARTY2)":50}},
 "municipalities":{"71072":{"CANDIDATE A (PARTY1)":100,"Others (OTHERS)":50}}}
```

- Candidates are identified by `NAME (PARTY)`.
- `states` is keyed by the 2-digit numeric code of the state. Unknown letter codes
  (`BR`, `ZZ` for votes abroad) are kept as they are. All the candidates are kept.
- `municipalities` is keyed by the municipality code of the source. Only the
  `topCandidates` candidates with the most votes are kept, the others are summed
  in `Others (OTHERS)`. Equal vote counts are ordered by name.
- Within a unit, candidates are listed by decreasing number of votes.

**Known limitation:** the source uses 5-digit municipality codes while most map
layers use 7-digit codes. The codes are written as found in the source and the
front end has to reconcile them.

With the `municipalityOnly` granularity, the `states` member is omitted and the
subdivision column is not needed.

## Configuration

All options can be provided in a JSON file passed with `--config`. Flags on the
command line take precedence.

| Key                       | Default                              |
|---------------------------|--------------------------------------|
| `inputDirectory`          | `raw_csv`                            |
| `outputDirectory`         | `data`                               |
| `topCandidates`           | `10`                                 |
| `offices`                 | `["PRESIDENT","GOVERNOR","SENATOR"]` |
| `years`                   | `[2010, 2014, 2018, 2022]`           |
| `granularity`             | `twoLevel` or `municipalityOnly`     |
| `chunkSize`               | `100000` rows                        |
| `delimiter`               | `;`                                  |
| `strict`                  | `false`                              |
| `maxMalformedRowsPerFile` | `0`                                  |
| `maxUnrecognizedFiles`    | `0`                                  |
| `reportPath`              | none                                 |

`chunkSize` only bounds the memory used while reading; it has no effect on the output.

## Exit codes

| Code | Meaning                                                          |
|------|------------------------------------------------------------------|
| 0    | success                                                          |
| 1    | fatal error: configuration, input directory or output write      |
| 2    | completed, but some input files could not be read                |
| 3    | strict mode: too many malformed rows or unrecognized files       |
| 4    | the output differs from the `--reference` documents              |

*/
