/*!

This is the long-form manual for `county_series` and `covid_dash`.

## Files

### Raw time series

The county-level file published by The New York Times
(`us-counties.csv`). The columns `date`, `county`, `state`, `cases` and
`deaths` are required, other columns (`fips`) are ignored. `cases` and
`deaths` are cumulative counts. A blank count is accepted on the rows that
are dropped for lack of a population, and rejected on the others.

New York City is reported as a single unit under the county name
`New York City`, state `New York`. Its population is not part of the census
tables and is added during the preparation with the 2019 estimate
(8,336,817).

### Population

A CSV file with the columns `county`, `state` and `population`. It can be
produced from the census workbook of annual county estimates
(`co-est2019-annres.xlsx`) with:

```bash
covid_dash population -i co-est2019-annres.xlsx -o 2019_county_populations.csv
```

Only the rows of the form `.<Name> County, <State>` are kept.

### Merged table

The output of `covid_dash prepare`, one row per day and location:

```text
date,county,state,total_cases,total_deaths,population
2020-03-13,Travis,Texas,2,0,1273954
```

Rows of the raw time series without a population entry are dropped with a
warning by default (`--unmatched warn`). Use `--unmatched reject` to stop
instead, or `--unmatched drop` to drop them silently.

Cumulative totals that decrease from one day to the next are reported with a
warning (`--monotonic warn`). They are never corrected: a decrease shows up as
a negative number of new cases.

### Location catalog

A single-column CSV file (`location`) with the display strings offered in
the location picker, for instance `Travis, Texas`. `prepare` writes it next to
the merged table; `covid_dash catalog` checks that an existing catalog still
matches the table.

## Measurements

* `total cases`, `total deaths`: the cumulative counts.
* `new cases`, `new deaths`: the daily increments. The first day of a location
  counts entirely as new.
* `new cases (7 day average)`, `new deaths (7 day average)`: the mean of the
  daily increments over the last 7 observations. There is no value for the
  first 6 observations of a location.

The derived measurements are always computed over the whole history of a
location, then restricted to the timespan. The timespan `two weeks` covers the
14 days ending yesterday.

With the normalization `per 100,000`, every value is divided by the
population of the location and multiplied by 100,000.

## Query configuration

A query can be described in a JSON file:

```json
{
  "table": "clean_covid_data.csv",
  "locations": ["Travis, Texas", "New York City, New York"],
  "measurement": "new cases (7 day average)",
  "normalization": "per 100,000",
  "timespan": "two weeks",
  "outputPath": "travis_nyc.json"
}
```

Paths are relative to the configuration file. The flags of `covid_dash query`
override the values of the configuration.

*/
